/// Core domain types for documents, extracted links, and resolution outcomes.
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A text file (page or script) somewhere under the site root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Document {
    /// Absolute (or root-joined) path of the file on disk.
    pub path: PathBuf,
    /// Path relative to the site root, used for reporting and depth checks.
    pub relative: PathBuf,
}

impl Document {
    /// Build a document from its on-disk path and the root it lives under.
    pub fn new(root: &Path, path: &Path) -> Self {
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        Self {
            path: path.to_path_buf(),
            relative,
        }
    }

    /// Directory containing the document. Links resolve against this.
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Number of directories between the root and this document.
    /// `a/b/doc.html` has depth 2, `index.html` has depth 0.
    pub fn depth(&self) -> usize {
        self.relative.components().count().saturating_sub(1)
    }
}

/// A reference string pulled out of a document's `href`/`src` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReference {
    /// One-based line of the first occurrence.
    pub line: u32,
    /// Raw attribute value exactly as written.
    pub raw: String,
    /// Byte span of the raw value within the document text.
    pub span: Range<usize>,
}

/// Where a resolved link points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Target {
    /// External URL, `mailto:`, `javascript:` and friends. Never checked.
    External,
    /// An existing file on disk.
    File(PathBuf),
    /// Bare fragment or empty link: points back at the same document.
    SameDocument,
}

/// Outcome of resolving one link. Exactly one per (document, link) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// The link points at something valid (or out of scope).
    Resolved {
        /// What the link resolved to.
        target: Target,
    },
    /// The link is broken, or uses a form the site convention forbids.
    Unresolved(Failure),
}

impl Resolution {
    /// Shorthand for a resolved file target.
    pub const fn file(path: PathBuf) -> Self {
        Self::Resolved {
            target: Target::File(path),
        }
    }
}

/// Why a link failed, with a hint for fixing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Classification bucket.
    pub category: FailureCategory,
    /// Human-readable description of what went wrong.
    pub reason: String,
    /// Replacement text or corrective hint, when one can be computed.
    pub suggestion: Option<String>,
}

/// Mutually exclusive classification buckets for broken links.
/// Declaration order is the presentation order in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Unreplaced `${...}` or `{%...%}` placeholder.
    TemplateVariable,
    /// Root-relative `/path` link where a document-relative one is required.
    AbsolutePathMisuse,
    /// The target exists under a differently-cased name.
    CaseMismatch,
    /// Wrong number of `..` segments for the document's depth.
    PathDepthMismatch,
    /// Points into the old content-management export layout.
    LegacyPathReference,
    /// Stylesheet, script, image, or document asset that doesn't exist.
    MissingAsset,
    /// Anything else, typically a missing `.html` page.
    MissingDocument,
}

impl FailureCategory {
    /// Heading used when grouping report output.
    pub const fn title(self) -> &'static str {
        match self {
            Self::AbsolutePathMisuse => "Absolute paths (should be relative)",
            Self::CaseMismatch => "Case mismatches",
            Self::LegacyPathReference => "Legacy path references",
            Self::MissingAsset => "Missing assets",
            Self::MissingDocument => "Missing documents",
            Self::PathDepthMismatch => "Incorrect path depth",
            Self::TemplateVariable => "Unprocessed template variables",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AbsolutePathMisuse => "absolute-path",
            Self::CaseMismatch => "case-mismatch",
            Self::LegacyPathReference => "legacy-path",
            Self::MissingAsset => "missing-asset",
            Self::MissingDocument => "missing-document",
            Self::PathDepthMismatch => "path-depth",
            Self::TemplateVariable => "template-variable",
        };
        f.write_str(name)
    }
}

/// Coarse file type of a link target, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// `.css`
    Css,
    /// `.pdf` and other downloadable documents.
    Document,
    /// Pages and anything unrecognized.
    Html,
    /// Raster and vector images, icons.
    Image,
    /// `.js` / `.mjs`
    Js,
}

impl LinkKind {
    /// Classify a link path (query and fragment already stripped) by extension.
    pub fn of(path: &str) -> Self {
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "css" => Self::Css,
            "doc" | "docx" | "pdf" | "xlsx" => Self::Document,
            "gif" | "ico" | "jpeg" | "jpg" | "png" | "svg" | "webp" => Self::Image,
            "js" | "mjs" => Self::Js,
            _ => Self::Html,
        }
    }

    /// Whether a missing target of this kind counts as a missing asset.
    pub const fn is_asset(self) -> bool {
        !matches!(self, Self::Html)
    }

    /// Short label shown next to each link in reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Css => "CSS",
            Self::Document => "Document",
            Self::Html => "HTML",
            Self::Image => "Image",
            Self::Js => "JS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_directories_below_root() {
        let root = Path::new("/site");
        assert_eq!(Document::new(root, Path::new("/site/index.html")).depth(), 0);
        assert_eq!(Document::new(root, Path::new("/site/a/b/doc.html")).depth(), 2);
    }

    #[test]
    fn link_kind_by_extension() {
        assert_eq!(LinkKind::of("assets/site.CSS"), LinkKind::Css);
        assert_eq!(LinkKind::of("../logo.svg"), LinkKind::Image);
        assert_eq!(LinkKind::of("guide.pdf"), LinkKind::Document);
        assert_eq!(LinkKind::of("about/index.html"), LinkKind::Html);
        assert_eq!(LinkKind::of("about"), LinkKind::Html);
        assert!(LinkKind::of("app.js").is_asset());
        assert_eq!(LinkKind::of("app.mjs").label(), "JS");
    }
}
