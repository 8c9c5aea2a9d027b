//! Whole-tree link audit: a lazy stream of findings plus a grouped report.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::resolver::{self, Resolver};
use crate::scanner::{self, AttributeExtractor, LinkExtractor};
use crate::types::{Document, Failure, FailureCategory, LinkKind, LinkReference, Resolution};

/// One resolved link: where it was found and what it resolved to.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Document containing the link.
    pub document: Document,
    /// The link as extracted.
    pub link: LinkReference,
    /// Outcome of resolving it.
    pub resolution: Resolution,
}

/// Lazy scan over every auditable document under the root.
///
/// Yields one item per unique (document, link) pair. Document-level failures
/// (unreadable, not UTF-8) and resolver I/O failures come through as `Err`
/// items so the caller can log them and keep going. Each call to
/// [`audit_tree`] rescans from scratch.
pub struct AuditTree<'a> {
    /// The document currently being drained and its remaining links.
    current: Option<(Document, std::vec::IntoIter<LinkReference>)>,
    /// Remaining documents to visit.
    documents: Box<dyn Iterator<Item = Document> + 'a>,
    /// Number of documents opened so far, including failed ones.
    documents_scanned: usize,
    /// How links are pulled out of document text.
    extractor: &'a dyn LinkExtractor,
    /// Resolves links against the site root.
    resolver: Resolver<'a>,
}

/// Start an audit of `config.root`, skipping `config.exclude` directories.
pub fn audit_tree(config: &Config) -> AuditTree<'_> {
    AuditTree::with_extractor(config, &AttributeExtractor)
}

impl<'a> AuditTree<'a> {
    /// Start an audit with a specific link extractor.
    pub fn with_extractor(config: &'a Config, extractor: &'a dyn LinkExtractor) -> Self {
        let documents = scanner::discover(&config.root, &config.audit_extensions, &config.exclude);
        Self {
            current: None,
            documents: Box::new(documents),
            documents_scanned: 0,
            extractor,
            resolver: Resolver::new(&config.root, &config.legacy_markers),
        }
    }

    /// Documents visited so far. After the iterator is exhausted, the total.
    pub const fn documents_scanned(&self) -> usize {
        self.documents_scanned
    }

    /// Open the next document and queue its unique links.
    ///
    /// # Errors
    ///
    /// Returns read or decode failures for that document.
    fn open(&mut self, document: Document) -> Result<(), Error> {
        self.documents_scanned = self.documents_scanned.saturating_add(1);
        let content = scanner::read_text(&document.path)?;
        let links = scanner::unique_links(self.extractor, &content);
        tracing::debug!("{}: {} unique links", document.relative.display(), links.len());
        self.current = Some((document, links.into_iter()));
        Ok(())
    }
}

impl Iterator for AuditTree<'_> {
    type Item = Result<Finding, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((document, links)) = &mut self.current
                && let Some(link) = links.next()
            {
                let outcome = self.resolver.resolve(&link.raw, &document.path);
                return Some(outcome.map(|resolution| Finding {
                    document: document.clone(),
                    link,
                    resolution,
                }));
            }

            self.current = None;
            let document = self.documents.next()?;
            if let Err(e) = self.open(document) {
                return Some(Err(e));
            }
        }
    }
}

/// A broken link as it appears in the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    /// Why it failed.
    pub failure: Failure,
    /// What kind of file the link targets.
    pub kind: LinkKind,
    /// The link as written.
    pub link: LinkReference,
}

/// Broken links grouped by document, then by failure category.
#[derive(Debug, Default, Serialize)]
pub struct AuditReport {
    /// Documents opened.
    pub documents_scanned: usize,
    /// Unresolved links keyed by document (relative to root) and category.
    pub failures: BTreeMap<PathBuf, BTreeMap<FailureCategory, Vec<ReportEntry>>>,
    /// Unique links checked across all documents.
    pub links_checked: usize,
    /// Documents that could not be audited, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

impl AuditReport {
    /// Drain an audit, logging per-file errors and grouping failures.
    pub fn collect(mut tree: AuditTree<'_>) -> Self {
        let mut report = Self::default();
        for item in &mut tree {
            match item {
                Ok(finding) => report.record(finding),
                Err(e) => {
                    tracing::warn!("{e}");
                    report.skipped.push((error_path(&e), e.to_string()));
                },
            }
        }
        report.documents_scanned = tree.documents_scanned();
        report
    }

    /// Add one finding. Resolved links only count toward the total.
    pub fn record(&mut self, finding: Finding) {
        self.links_checked = self.links_checked.saturating_add(1);
        let Resolution::Unresolved(failure) = finding.resolution else {
            return;
        };
        let kind = LinkKind::of(resolver::strip_query_and_fragment(&finding.link.raw));
        self.failures
            .entry(finding.document.relative)
            .or_default()
            .entry(failure.category)
            .or_default()
            .push(ReportEntry {
                failure,
                kind,
                link: finding.link,
            });
    }

    /// Total unresolved links.
    pub fn failure_count(&self) -> usize {
        self.failures.values().flat_map(BTreeMap::values).map(Vec::len).sum()
    }

    /// Unresolved links per category, across all documents.
    pub fn counts_by_category(&self) -> BTreeMap<FailureCategory, usize> {
        let mut counts: BTreeMap<FailureCategory, usize> = BTreeMap::new();
        for by_cat in self.failures.values() {
            for (category, entries) in by_cat {
                let count = counts.entry(*category).or_default();
                *count = count.saturating_add(entries.len());
            }
        }
        counts
    }
}

/// Best-effort path for a skipped-document error.
fn error_path(e: &Error) -> PathBuf {
    match e {
        Error::DirectoryUnreadable { path, .. }
        | Error::NotUtf8 { path }
        | Error::ReadFailed { path, .. }
        | Error::WriteFailed { path, .. } => path.clone(),
        _ => PathBuf::new(),
    }
}
