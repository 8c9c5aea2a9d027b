use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::audit::AuditReport;
use crate::emoji::{self, Census};
use crate::error::Error;
use crate::rewriter::RewriteSummary;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened, and
/// how to fix it when there is an obvious fix.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::ConfigNotFound { path } => format!("\
# Error: Config Not Found

`{}` does not exist.

## Fix

Drop `--config` to use `.sitemigrate.toml` from the working directory, or
create the file.
", path.display()),

        Error::RootNotFound { path } => format!("\
# Error: Site Root Not Found

`{}` is not a directory.

## Fix

Set `root` in `.sitemigrate.toml` or pass `--root <DIR>`.
", path.display()),

        Error::TomlDe(e) => format!("\
# Error: Invalid Config

{e}
"),
        Error::NotUtf8 { path } => format!("\
# Error: Not UTF-8

`{}` is not valid UTF-8 text and was left untouched.
", path.display()),

        Error::DirectoryUnreadable { path, source } => format!("\
# Error: Directory Unreadable

Could not list `{}`: {source}
", path.display()),

        Error::ReadFailed { path, source } | Error::WriteFailed { path, source } => format!("\
# Error: I/O

`{}`: {source}
", path.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: JSON Serialization

{e}
"),
    }
}

/// Render the broken-link report as markdown, grouped by document then category.
pub fn render_audit_report(report: &AuditReport) -> String {
    let mut out = String::from("# Broken Links\n");

    if report.failures.is_empty() {
        out.push_str("\nNo broken links found.\n");
    }

    for (document, by_category) in &report.failures {
        let _ = write!(out, "\n## {}\n", document.display());
        for (category, entries) in by_category {
            let _ = write!(out, "\n### {} ({})\n\n", category.title(), entries.len());
            for entry in entries {
                let _ = writeln!(
                    out,
                    "- line {}: [{}] `{}`: {}",
                    entry.link.line,
                    entry.kind.label(),
                    entry.link.raw,
                    entry.failure.reason
                );
                if let Some(suggestion) = &entry.failure.suggestion {
                    let _ = writeln!(out, "  fix: {suggestion}");
                }
            }
        }
    }

    render_skipped(&mut out, &report.skipped);

    out.push_str("\n## Summary\n\n");
    for (category, count) in report.counts_by_category() {
        let _ = writeln!(out, "- {category}: {count}");
    }
    let _ = writeln!(
        out,
        "\n{} broken links in {} documents ({} documents scanned, {} links checked)",
        report.failure_count(),
        report.failures.len(),
        report.documents_scanned,
        report.links_checked,
    );
    out
}

/// Render the outcome of a rewrite pass.
pub fn render_rewrite_summary(summary: &RewriteSummary, dry_run: bool) -> String {
    let verb = if dry_run { "Would update" } else { "Updated" };
    let mut out = String::new();
    for path in &summary.modified {
        let _ = writeln!(out, "{verb}: {}", path.display());
    }
    for (path, reason) in &summary.failed {
        let _ = writeln!(out, "Failed: {}: {reason}", path.display());
    }
    let _ = writeln!(
        out,
        "\nScanned {} files, {} modified, {} failed",
        summary.scanned,
        summary.modified.len(),
        summary.failed.len(),
    );
    out
}

/// Render the emoji removal report, most-affected files first.
pub fn render_strip_report(scanned: usize, removed: &[(PathBuf, usize)], keep: &[char]) -> String {
    let total: usize = removed.iter().map(|(_, n)| n).sum();
    let kept: Vec<String> = keep.iter().map(|c| emoji::label(*c)).collect();

    let mut out = String::from("# Emoji Removal\n\n");
    let _ = writeln!(out, "- files scanned: {scanned}");
    let _ = writeln!(out, "- files modified: {}", removed.len());
    let _ = writeln!(out, "- emoji removed: {total}");
    let _ = writeln!(out, "- kept: {}", kept.join(", "));

    if !removed.is_empty() {
        out.push_str("\n## Files\n\n");
        let mut sorted: Vec<&(PathBuf, usize)> = removed.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (path, n) in sorted {
            let name = path.display().to_string();
            let _ = writeln!(out, "- {name:<60} {n:>3} removed");
        }
    }
    out
}

/// Render the emoji verification census. Files that could not be read are
/// listed last so an incomplete census is visible.
pub fn render_census(
    scanned: usize,
    per_file: &[(PathBuf, Census)],
    totals: &Census,
    skipped: &[(PathBuf, String)],
) -> String {
    let mut out = String::from("# Emoji Verification\n\n");
    let _ = writeln!(out, "- files scanned: {scanned}");
    let _ = writeln!(out, "- files with emoji: {}", per_file.len());
    let _ = writeln!(out, "- total occurrences: {}", totals.total());

    if !totals.is_empty() {
        out.push_str("\n## Found\n\n");
        let mut rows: Vec<(char, usize, &str)> = Vec::new();
        rows.extend(totals.allowed.iter().map(|(c, n)| (*c, *n, "allowed")));
        rows.extend(totals.stray.iter().map(|(c, n)| (*c, *n, "should be removed")));
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (c, n, status) in rows {
            let _ = writeln!(out, "- {c} {}: {n} ({status})", emoji::label(c));
        }
    }

    if !per_file.is_empty() {
        out.push_str("\n## By file\n");
        let mut sorted: Vec<&(PathBuf, Census)> = per_file.iter().collect();
        sorted.sort_by(|a, b| b.1.total().cmp(&a.1.total()).then_with(|| a.0.cmp(&b.0)));
        for (path, census) in sorted {
            let _ = write!(out, "\n{} ({} total)\n", path.display(), census.total());
            for (c, n) in census.allowed.iter().chain(census.stray.iter()) {
                let _ = writeln!(out, "  {c}: {n}");
            }
        }
    }
    render_skipped(&mut out, skipped);
    out
}

/// Append a "Skipped" section listing files that could not be processed.
fn render_skipped(out: &mut String, skipped: &[(PathBuf, String)]) {
    if skipped.is_empty() {
        return;
    }
    out.push_str("\n## Skipped\n\n");
    for (path, reason) in skipped {
        let _ = writeln!(out, "- {}: {reason}", path.display());
    }
}

/// Write a rendered report under the site root.
///
/// # Errors
///
/// Returns `Error::WriteFailed` if the file cannot be written.
pub fn write_report(path: &Path, content: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| Error::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
