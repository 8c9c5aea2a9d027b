//! Link resolution against the site tree, and classification of failures.

use std::path::{Component, Path};

use crate::error::Error;
use crate::scanner::normalize_path;
use crate::types::{Document, Failure, FailureCategory, LinkKind, Resolution, Target};

/// Prefixes of links that point off-site and are never checked.
const EXTERNAL_PREFIXES: &[&str] = &["data:", "http://", "https://", "javascript:", "mailto:", "tel:"];

/// Unreplaced placeholder openers left behind by the export's templating.
const TEMPLATE_DELIMITERS: &[&str] = &["${", "{%"];

/// Resolves links found in documents under one site root.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    /// Substrings marking the old content-management export layout.
    legacy_markers: &'a [String],
    /// Site root that root-relative links resolve against.
    root: &'a Path,
}

impl<'a> Resolver<'a> {
    /// Resolver for documents under `root`.
    pub const fn new(root: &'a Path, legacy_markers: &'a [String]) -> Self {
        Self { legacy_markers, root }
    }

    /// Resolve `link` as written inside the document at `document`.
    ///
    /// A missing target is a normal `Resolution::Unresolved`, never an error.
    /// Root-relative links are always reported as `AbsolutePathMisuse`, even
    /// when the target exists. Same inputs and filesystem state give the same
    /// result.
    ///
    /// # Errors
    ///
    /// Returns `Error::DirectoryUnreadable` if listing a directory fails during
    /// the case-mismatch check for a reason other than it not existing.
    pub fn resolve(&self, link: &str, document: &Path) -> Result<Resolution, Error> {
        if link.starts_with('#') {
            return Ok(Resolution::Resolved { target: Target::SameDocument });
        }
        if is_external(link) {
            return Ok(Resolution::Resolved { target: Target::External });
        }

        let clean = strip_query_and_fragment(link);
        if clean.is_empty() {
            return Ok(Resolution::Resolved { target: Target::SameDocument });
        }

        if has_template_variable(link) {
            return Ok(Resolution::Unresolved(Failure {
                category: FailureCategory::TemplateVariable,
                reason: "unprocessed template variable".to_string(),
                suggestion: Some("replace the placeholder with a concrete relative path".to_string()),
            }));
        }

        let doc_dir = document.parent().unwrap_or(self.root);

        if let Some(from_root) = clean.strip_prefix('/') {
            let target = normalize_path(&self.root.join(from_root));
            return Ok(Resolution::Unresolved(self.root_relative_failure(doc_dir, &target)));
        }

        let candidate = normalize_path(&doc_dir.join(clean));
        if candidate.exists() {
            return Ok(Resolution::file(candidate));
        }

        let failure = self.classify(clean, document, doc_dir)?;
        tracing::debug!("{link} in {}: {}", document.display(), failure.category);
        Ok(Resolution::Unresolved(failure))
    }

    /// Pick the first matching failure category, in priority order.
    /// Template variables and root-relative links are handled before this.
    ///
    /// # Errors
    ///
    /// Propagates directory listing failures from the case check.
    fn classify(&self, clean: &str, document: &Path, doc_dir: &Path) -> Result<Failure, Error> {
        if let Some(corrected) = self.find_case_corrected(doc_dir, clean)? {
            return Ok(Failure {
                category: FailureCategory::CaseMismatch,
                reason: format!("file exists as {corrected} (case mismatch)"),
                suggestion: Some(corrected),
            });
        }

        let ups = parent_segment_count(clean);
        let depth = self.document_depth(document);
        if ups > 0 && ups != depth {
            return Ok(Failure {
                category: FailureCategory::PathDepthMismatch,
                reason: format!("uses {ups} `../` segments but the document is {depth} levels deep"),
                suggestion: Some(format!("expected {depth} `../` segments")),
            });
        }

        if let Some(marker) = self.legacy_markers.iter().find(|m| clean.contains(m.as_str())) {
            return Ok(Failure {
                category: FailureCategory::LegacyPathReference,
                reason: format!("references the legacy export structure ({marker})"),
                suggestion: None,
            });
        }

        if LinkKind::of(clean).is_asset() {
            return Ok(Failure {
                category: FailureCategory::MissingAsset,
                reason: "asset not found at path".to_string(),
                suggestion: None,
            });
        }

        Ok(Failure {
            category: FailureCategory::MissingDocument,
            reason: "target file does not exist".to_string(),
            suggestion: None,
        })
    }

    /// Number of directories between the root and `document`.
    fn document_depth(&self, document: &Path) -> usize {
        Document::new(&normalize_path(self.root), &normalize_path(document)).depth()
    }

    /// Build the failure for a `/path` link, suggesting its document-relative form.
    fn root_relative_failure(&self, doc_dir: &Path, target: &Path) -> Failure {
        let relative = relative_link(&normalize_path(doc_dir), target);
        let reason = if target.exists() {
            "root-relative link; site convention requires document-relative paths"
        } else {
            "root-relative link to a file that does not exist"
        };
        Failure {
            category: FailureCategory::AbsolutePathMisuse,
            reason: reason.to_string(),
            suggestion: Some(relative),
        }
    }

    /// Walk the link's segments from `base`, matching each against the real
    /// directory listing. Returns the link with corrected casing when every
    /// segment exists under some casing and at least one differs.
    ///
    /// Checks every segment, not only the basename, so `about/index.html` finds
    /// `About/Index.html`. A `..` that would leave the root ends the search.
    ///
    /// # Errors
    ///
    /// Returns `Error::DirectoryUnreadable` for listing failures other than not-found.
    fn find_case_corrected(&self, base: &Path, link: &str) -> Result<Option<String>, Error> {
        let mut dir = normalize_path(base);
        let Ok(below_root) = dir.strip_prefix(normalize_path(self.root)) else {
            return Ok(None);
        };
        let mut depth = below_root.components().count();
        let mut corrected: Vec<String> = Vec::new();
        let mut changed = false;

        let segments: Vec<&str> = link.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
        let last = segments.len().saturating_sub(1);

        for (i, segment) in segments.iter().enumerate() {
            if *segment == ".." {
                let Some(up) = depth.checked_sub(1) else {
                    return Ok(None);
                };
                depth = up;
                dir = normalize_path(&dir.join(segment));
                corrected.push((*segment).to_string());
                continue;
            }

            let Some(actual) = match_entry(&dir, segment)? else {
                return Ok(None);
            };
            if actual != *segment {
                changed = true;
            }
            dir.push(&actual);
            depth = depth.saturating_add(1);
            if i < last && !listable(&dir).is_dir() {
                return Ok(None);
            }
            corrected.push(actual);
        }

        if !changed {
            return Ok(None);
        }
        Ok(Some(corrected.join("/")))
    }
}

/// Drop everything from the first `?`, then everything from the first `#`.
pub fn strip_query_and_fragment(link: &str) -> &str {
    let before_query = link.split_once('?').map_or(link, |(head, _)| head);
    before_query.split_once('#').map_or(before_query, |(head, _)| head)
}

/// Path from directory `from_dir` to `to`, `/`-separated, for use in markup.
/// Both paths must be normalized and share the same anchoring.
pub fn relative_link(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let dest: Vec<Component<'_>> = to.components().collect();
    let shared = from.iter().zip(dest.iter()).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = Vec::new();
    for _ in shared..from.len() {
        parts.push("..".to_string());
    }
    for component in dest.iter().skip(shared) {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    if parts.is_empty() {
        return ".".to_string();
    }
    parts.join("/")
}

/// Whether the link is off-site (or protocol-relative `//host/...`).
fn is_external(link: &str) -> bool {
    let lower = link.trim_start().to_ascii_lowercase();
    lower.starts_with("//") || EXTERNAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Whether the link still carries a template placeholder.
fn has_template_variable(link: &str) -> bool {
    TEMPLATE_DELIMITERS.iter().any(|d| link.contains(d))
}

/// Count `..` path segments anywhere in the link.
fn parent_segment_count(link: &str) -> usize {
    link.split('/').filter(|s| *s == "..").count()
}

/// Normalization turns `.` into an empty path, which the OS won't list.
fn listable(dir: &Path) -> &Path {
    if dir.as_os_str().is_empty() {
        return Path::new(".");
    }
    dir
}

/// Find the entry in `dir` named `name`: exact match first, then the
/// alphabetically first case-insensitive match.
///
/// # Errors
///
/// Returns `Error::DirectoryUnreadable` unless the failure is a missing directory.
fn match_entry(dir: &Path, name: &str) -> Result<Option<String>, Error> {
    let entries = match std::fs::read_dir(listable(dir)) {
        Ok(entries) => entries,
        Err(e) if matches!(e.kind(), std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory) => {
            return Ok(None);
        },
        Err(source) => {
            return Err(Error::DirectoryUnreadable {
                path: dir.to_path_buf(),
                source,
            });
        },
    };

    let mut folded: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let entry_name = entry.file_name().to_string_lossy().into_owned();
        if entry_name == name {
            return Ok(Some(entry_name));
        }
        if entry_name.to_lowercase() == name.to_lowercase() {
            folded.push(entry_name);
        }
    }

    folded.sort();
    Ok(folded.into_iter().next())
}
