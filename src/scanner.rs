use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::Error;
use crate::types::{Document, LinkReference};

/// `href="..."` / `src='...'` attribute values. Pattern matching, not parsing:
/// the inputs are a small hand-authored corpus.
#[allow(clippy::expect_used, reason = "hardcoded pattern, compile-time invariant")]
static ATTRIBUTE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:href|src)\s*=\s*(?:"([^"]+)"|'([^']+)')"#).expect("valid regex")
});

/// Pulls link references out of document text.
/// The resolver only sees `LinkReference`s, so a structural parser can replace
/// the regex implementation without touching classification.
pub trait LinkExtractor {
    /// Every link in `content`, in document order, duplicates included.
    fn extract(&self, content: &str) -> Vec<LinkReference>;
}

/// Regex-based extraction of `href` and `src` attribute values.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeExtractor;

impl LinkExtractor for AttributeExtractor {
    fn extract(&self, content: &str) -> Vec<LinkReference> {
        let mut refs = Vec::new();
        let mut line = 1_u32;
        let mut counted_to = 0_usize;

        for cap in ATTRIBUTE_LINK.captures_iter(content) {
            let Some(value) = cap.get(1).or_else(|| cap.get(2)) else {
                continue;
            };
            let newlines = content.get(counted_to..value.start()).map_or(0, |s| s.matches('\n').count());
            line = line.saturating_add(u32::try_from(newlines).unwrap_or(u32::MAX));
            counted_to = value.start();

            refs.push(LinkReference {
                line,
                raw: value.as_str().to_string(),
                span: value.range(),
            });
        }
        refs
    }
}

/// Extract links and drop repeats of the same raw text, keeping the first.
pub fn unique_links(extractor: &dyn LinkExtractor, content: &str) -> Vec<LinkReference> {
    let mut seen: HashSet<String> = HashSet::new();
    extractor
        .extract(content)
        .into_iter()
        .filter(|r| seen.insert(r.raw.clone()))
        .collect()
}

/// List documents under `root` with one of `extensions`, skipping any directory
/// whose name is in `exclude`. Sorted by path so output is stable.
///
/// Entries the walker cannot read are logged and skipped.
pub fn discover<'a>(
    root: &'a Path,
    extensions: &'a [String],
    exclude: &'a [String],
) -> impl Iterator<Item = Document> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |e| e.depth() == 0 || !is_excluded_dir(e, exclude))
        .filter_map(|res| match res {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {e}");
                None
            },
        })
        .filter(|e| e.file_type().is_file())
        .filter(move |e| has_extension(e.path(), extensions))
        .map(move |e| Document::new(root, e.path()))
}

/// Read a document as UTF-8 text.
///
/// # Errors
///
/// Returns `Error::NotUtf8` if the bytes don't decode, or `Error::ReadFailed`
/// for any other read failure.
pub fn read_text(path: &Path) -> Result<String, Error> {
    let bytes = std::fs::read(path).map_err(|source| Error::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_err| Error::NotUtf8 {
        path: path.to_path_buf(),
    })
}

/// Write text back to a document in place.
///
/// # Errors
///
/// Returns `Error::WriteFailed` if the write fails.
pub fn write_text(path: &Path, content: &str) -> Result<(), Error> {
    std::fs::write(path, content).map_err(|source| Error::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<std::path::Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    components.iter().collect()
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
/// `..` directly under the filesystem root stays at the root.
fn push_normalized_component<'a>(
    components: &mut Vec<std::path::Component<'a>>,
    component: std::path::Component<'a>,
) {
    match component {
        std::path::Component::CurDir => {},
        std::path::Component::ParentDir => match components.last() {
            Some(std::path::Component::RootDir | std::path::Component::Prefix(_)) => {},
            Some(std::path::Component::ParentDir) | None => components.push(component),
            Some(_) => {
                components.pop();
            },
        },
        other => components.push(other),
    }
}

/// Whether a walk entry is a directory named in the exclude list.
fn is_excluded_dir(entry: &walkdir::DirEntry, exclude: &[String]) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    exclude.iter().any(|x| *x == name)
}

/// Case-insensitive extension check.
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions.iter().any(|x| x.eq_ignore_ascii_case(ext))
}
