//! CLI commands: audit, rewrite, strip-emoji, verify-emoji.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::audit::{AuditReport, audit_tree};
use crate::config::Config;
use crate::diagnostics;
use crate::emoji::{self, Census};
use crate::error;
use crate::rewriter::{self, MigrationPlan};
use crate::scanner;

/// Audit every document's links and print the report grouped by document.
/// Exit 0 when every link resolves, 1 when any is broken.
///
/// # Errors
///
/// Returns `Error::RootNotFound`, JSON serialization failures, or report write failures.
pub fn audit(config: &Config, json: bool, report_file: Option<&Path>) -> Result<ExitCode, error::Error> {
    config.ensure_root()?;

    let report = AuditReport::collect(audit_tree(config));
    let rendered = diagnostics::render_audit_report(&report);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{rendered}");
    }

    if let Some(path) = report_destination(config, report_file) {
        diagnostics::write_report(&path, &rendered)?;
        eprintln!("Wrote report to {}", path.display());
    }

    if report.failure_count() > 0 {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Apply relocations, vendor suffix stripping, and the replacement table to
/// every rewritable document. Exit 1 if any file failed.
///
/// # Errors
///
/// Returns `Error::RootNotFound` if the root is missing.
pub fn rewrite(config: &Config, dry_run: bool) -> Result<ExitCode, error::Error> {
    config.ensure_root()?;

    let plan = MigrationPlan::new(config);
    let summary = rewriter::rewrite_tree(config, &config.rewrite_extensions, dry_run, |document, text| {
        return plan.apply(document, text);
    });

    print!("{}", diagnostics::render_rewrite_summary(&summary, dry_run));
    return Ok(exit_for_failures(summary.failed.len()));
}

/// Strip decorative emoji from markup, keeping the configured symbols.
///
/// # Errors
///
/// Returns `Error::RootNotFound` if the root is missing.
pub fn strip_emoji(config: &Config, dry_run: bool) -> Result<ExitCode, error::Error> {
    config.ensure_root()?;

    let mut removed: Vec<(PathBuf, usize)> = Vec::new();
    let summary = rewriter::rewrite_tree(config, &config.audit_extensions, dry_run, |document, text| {
        let (out, count) = emoji::strip(text, &config.keep_emoji);
        if count > 0 {
            removed.push((document.relative.clone(), count));
        }
        return (out, count > 0);
    });
    removed.retain(|(path, _)| return summary.modified.contains(path));

    print!("{}", diagnostics::render_strip_report(summary.scanned, &removed, &config.keep_emoji));
    if !summary.failed.is_empty() {
        print!("{}", diagnostics::render_rewrite_summary(&summary, dry_run));
    }
    return Ok(exit_for_failures(summary.failed.len()));
}

/// Count emoji left in markup. Exit 1 if any are not on the keep list.
/// Unreadable files are listed as skipped and do not change the exit code.
///
/// # Errors
///
/// Returns `Error::RootNotFound`, or report write failures.
pub fn verify_emoji(config: &Config, report_file: Option<&Path>) -> Result<ExitCode, error::Error> {
    config.ensure_root()?;

    let mut scanned = 0_usize;
    let mut per_file: Vec<(PathBuf, Census)> = Vec::new();
    let mut skipped: Vec<(PathBuf, String)> = Vec::new();
    let mut totals = Census::default();

    for document in scanner::discover(&config.root, &config.audit_extensions, &config.exclude) {
        scanned = scanned.saturating_add(1);
        let content = match scanner::read_text(&document.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("{e}");
                skipped.push((document.relative, e.to_string()));
                continue;
            },
        };
        let census = Census::of(&content, &config.keep_emoji);
        if !census.is_empty() {
            totals.merge(&census);
            per_file.push((document.relative, census));
        }
    }

    let rendered = diagnostics::render_census(scanned, &per_file, &totals, &skipped);
    print!("{rendered}");

    if let Some(path) = report_file.map(|p| return config.root.join(p)) {
        diagnostics::write_report(&path, &rendered)?;
        eprintln!("Wrote report to {}", path.display());
    }

    return Ok(exit_for_failures(totals.stray.len()));
}

/// Exit 1 when anything went wrong, 0 otherwise.
fn exit_for_failures(count: usize) -> ExitCode {
    if count > 0 {
        return ExitCode::from(1);
    }
    return ExitCode::SUCCESS;
}

/// Report file from the flag, falling back to the configured one. Relative to the root.
fn report_destination(config: &Config, flag: Option<&Path>) -> Option<PathBuf> {
    return flag.map(|p| return config.root.join(p)).or_else(|| return config.report_path());
}
