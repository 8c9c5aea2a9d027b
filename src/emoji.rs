//! Decorative emoji removal and verification.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Code point ranges treated as emoji. Overlapping blocks from the original
/// migration list are merged; the variation selector U+FE0F is deliberately
/// absent so it survives next to kept symbols.
const EMOJI_RANGES: &[RangeInclusive<char>] = &[
    '\u{2194}'..='\u{2199}',
    '\u{21A9}'..='\u{21AA}',
    '\u{2328}'..='\u{2328}',
    '\u{23CF}'..='\u{23CF}',
    '\u{23E9}'..='\u{23F3}',
    '\u{23F8}'..='\u{23FA}',
    '\u{24C2}'..='\u{24C2}',
    '\u{25AA}'..='\u{25AB}',
    '\u{25B6}'..='\u{25B6}',
    '\u{25C0}'..='\u{25C0}',
    '\u{25FB}'..='\u{25FE}',
    '\u{2600}'..='\u{27BF}',
    '\u{2934}'..='\u{2935}',
    '\u{2B05}'..='\u{2B07}',
    '\u{2B1B}'..='\u{2B1C}',
    '\u{2B50}'..='\u{2B50}',
    '\u{2B55}'..='\u{2B55}',
    '\u{3030}'..='\u{3030}',
    '\u{303D}'..='\u{303D}',
    '\u{3297}'..='\u{3297}',
    '\u{3299}'..='\u{3299}',
    '\u{1F1E0}'..='\u{1F1FF}',
    '\u{1F300}'..='\u{1F9FF}',
    '\u{1FA00}'..='\u{1FA6F}',
];

/// Whether `c` falls in any emoji range.
pub fn is_emoji(c: char) -> bool {
    EMOJI_RANGES.iter().any(|range| range.contains(&c))
}

/// Remove every emoji not in `keep`. Returns the new text and how many
/// characters were removed.
pub fn strip(text: &str, keep: &[char]) -> (String, usize) {
    let mut removed = 0_usize;
    let out: String = text
        .chars()
        .filter(|c| {
            if is_emoji(*c) && !keep.contains(c) {
                removed = removed.saturating_add(1);
                return false;
            }
            true
        })
        .collect();
    (out, removed)
}

/// Emoji occurrences in one text, split into allowed and stray.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Census {
    /// Counts of emoji on the keep list.
    pub allowed: BTreeMap<char, usize>,
    /// Counts of emoji that should have been removed.
    pub stray: BTreeMap<char, usize>,
}

impl Census {
    /// Count every emoji in `text`.
    pub fn of(text: &str, keep: &[char]) -> Self {
        let mut census = Self::default();
        for c in text.chars().filter(|c| is_emoji(*c)) {
            let bucket = if keep.contains(&c) { &mut census.allowed } else { &mut census.stray };
            let count = bucket.entry(c).or_default();
            *count = count.saturating_add(1);
        }
        census
    }

    /// Fold another census into this one.
    pub fn merge(&mut self, other: &Self) {
        for (c, n) in &other.allowed {
            let count = self.allowed.entry(*c).or_default();
            *count = count.saturating_add(*n);
        }
        for (c, n) in &other.stray {
            let count = self.stray.entry(*c).or_default();
            *count = count.saturating_add(*n);
        }
    }

    /// Total occurrences, allowed and stray.
    pub fn total(&self) -> usize {
        self.allowed.values().chain(self.stray.values()).sum()
    }

    /// Whether no emoji at all were found.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty() && self.stray.is_empty()
    }
}

/// Short label for report lines; emoji themselves may not render in every console.
pub fn label(c: char) -> String {
    match c {
        '\u{26A0}' => "WARNING".to_string(),
        '\u{2713}' => "CHECK".to_string(),
        '\u{2717}' => "X_MARK".to_string(),
        other => format!("U+{:04X}", u32::from(other)),
    }
}
