//! One-shot path migration: ordered substring replacement over document text.

use std::path::{Path, PathBuf};

use regex::{Captures, Regex};

use crate::config::{AssetRelocation, Config, Replacement};
use crate::error::Error;
use crate::resolver::relative_link;
use crate::scanner::{self, normalize_path};
use crate::types::Document;

/// Apply each replacement globally, in order. Later rules see the output of
/// earlier ones, so longer or more specific keys belong first.
/// Returns the new text and whether anything changed.
pub fn rewrite(text: &str, replacements: &[Replacement]) -> (String, bool) {
    let mut out = text.to_string();
    for rule in replacements {
        if rule.from.is_empty() || !out.contains(rule.from.as_str()) {
            continue;
        }
        out = out.replace(rule.from.as_str(), &rule.to);
    }
    let changed = out != text;
    (out, changed)
}

/// A legacy link value and the root-relative file it now points at.
struct Relocation {
    /// Matches the quoted link with any leading `../` run.
    pattern: Regex,
    /// New location under the root.
    target: PathBuf,
}

/// A custom asset filename tail and the directory its renamed file lives in.
struct AssetRule {
    /// Root-relative directory.
    dir: PathBuf,
    /// Extension kept on the renamed file.
    extension: String,
    /// Matches a quoted link ending in `<name><suffix>`.
    pattern: Regex,
}

/// Everything the rewrite command does to one document, in order:
/// relocations, custom-asset relocation, vendor suffix stripping, then the
/// replacement table.
pub struct MigrationPlan<'a> {
    assets: Vec<AssetRule>,
    relocations: Vec<Relocation>,
    replacements: &'a [Replacement],
    root: &'a Path,
    /// `None` when no suffixes are configured.
    suffix_pattern: Option<Regex>,
}

impl<'a> MigrationPlan<'a> {
    /// Build the plan from configuration. Rules whose pattern cannot be
    /// compiled are logged and left out.
    pub fn new(config: &'a Config) -> Self {
        Self {
            assets: config.asset_relocations.iter().filter_map(asset_rule).collect(),
            relocations: config.relocations.iter().filter_map(relocation).collect(),
            replacements: &config.replacements,
            root: &config.root,
            suffix_pattern: suffix_pattern(&config.vendor_suffixes),
        }
    }

    /// Rewrite one document's text. Returns the new text and whether it changed.
    pub fn apply(&self, document: &Document, text: &str) -> (String, bool) {
        let doc_dir = normalize_path(document.parent_dir());
        let mut out = text.to_string();

        for rule in &self.relocations {
            let link = relative_link(&doc_dir, &normalize_path(&self.root.join(&rule.target)));
            out = rule
                .pattern
                .replace_all(&out, |caps: &Captures<'_>| format!("{}{link}{}", &caps["open"], &caps["close"]))
                .into_owned();
        }

        for rule in &self.assets {
            out = rule
                .pattern
                .replace_all(&out, |caps: &Captures<'_>| {
                    let file = format!("{}{}", &caps["name"], rule.extension);
                    let target = normalize_path(&self.root.join(&rule.dir).join(file));
                    format!("{}{}{}", &caps["open"], relative_link(&doc_dir, &target), &caps["close"])
                })
                .into_owned();
        }

        if let Some(pattern) = &self.suffix_pattern {
            out = pattern.replace_all(&out, "$ext").into_owned();
        }
        let (out, _) = rewrite(&out, self.replacements);

        let changed = out != text;
        (out, changed)
    }
}

/// Counts from a tree-wide rewrite.
#[derive(Debug, Default)]
pub struct RewriteSummary {
    /// Documents that could not be read, decoded, or written.
    pub failed: Vec<(PathBuf, String)>,
    /// Documents whose text changed (relative to root).
    pub modified: Vec<PathBuf>,
    /// Documents visited.
    pub scanned: usize,
}

/// Rewrite every document under the root with one of `extensions` using `transform`.
/// Files are written one at a time; a failure on one file is logged and the
/// rest continue. Nothing is written when `dry_run` is set.
pub fn rewrite_tree<F>(config: &Config, extensions: &[String], dry_run: bool, mut transform: F) -> RewriteSummary
where
    F: FnMut(&Document, &str) -> (String, bool),
{
    let mut summary = RewriteSummary::default();

    for document in scanner::discover(&config.root, extensions, &config.exclude) {
        summary.scanned = summary.scanned.saturating_add(1);
        match rewrite_document(&document, dry_run, &mut transform) {
            Ok(true) => {
                tracing::info!("updated {}", document.relative.display());
                summary.modified.push(document.relative);
            },
            Ok(false) => tracing::debug!("no changes: {}", document.relative.display()),
            Err(e) => {
                tracing::warn!("{e}");
                summary.failed.push((document.relative, e.to_string()));
            },
        }
    }

    summary
}

/// Read, transform, and (unless dry-run) write back a single document.
///
/// # Errors
///
/// Returns read, decode, or write failures for this document.
fn rewrite_document<F>(document: &Document, dry_run: bool, transform: &mut F) -> Result<bool, Error>
where
    F: FnMut(&Document, &str) -> (String, bool),
{
    let content = scanner::read_text(&document.path)?;
    let (updated, changed) = transform(document, &content);
    if changed && !dry_run {
        scanner::write_text(&document.path, &updated)?;
    }
    Ok(changed)
}

/// Compile a relocation key. Leading `./` and `../` are dropped from the key so
/// the same legacy path matches from any depth; the match must span the whole
/// link value up to its closing quote, query, or fragment.
fn relocation(rule: &Replacement) -> Option<Relocation> {
    let mut key = rule.from.as_str();
    while let Some(rest) = key.strip_prefix("../").or_else(|| key.strip_prefix("./")) {
        key = rest;
    }
    if key.is_empty() {
        tracing::warn!("relocation key {:?} has no path after its `../` prefix", rule.from);
        return None;
    }

    let pattern = format!(r#"(?P<open>["'(])(?:\./)?(?:\.\./)*{}(?P<close>["'?#)])"#, regex::escape(key));
    let pattern = Regex::new(&pattern)
        .inspect_err(|e| tracing::error!("relocation {:?} rejected: {e}", rule.from))
        .ok()?;
    Some(Relocation {
        pattern,
        target: PathBuf::from(&rule.to),
    })
}

/// Compile a custom-asset rule: any quoted link whose last segment is
/// `<name><suffix>`, whatever directories precede it.
fn asset_rule(rule: &AssetRelocation) -> Option<AssetRule> {
    if rule.suffix.is_empty() {
        return None;
    }
    let pattern = format!(
        r#"(?P<open>["'])(?:[^"'\s]*/)?(?P<name>[^/"'\s]+?){}(?P<close>["'?#])"#,
        regex::escape(&rule.suffix)
    );
    let pattern = Regex::new(&pattern)
        .inspect_err(|e| tracing::error!("asset suffix {:?} rejected: {e}", rule.suffix))
        .ok()?;
    Some(AssetRule {
        dir: rule.dir.clone(),
        extension: rule.extension().to_string(),
        pattern,
    })
}

/// Regex matching any configured vendor suffix followed by a web extension.
/// The extension is kept, the suffix dropped.
fn suffix_pattern(suffixes: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = suffixes.iter().filter(|s| !s.is_empty()).map(|s| regex::escape(s)).collect();
    if alternatives.is_empty() {
        return None;
    }
    let pattern = format!(r"(?:{})(?P<ext>\.(?:html|js|css))\b", alternatives.join("|"));
    Regex::new(&pattern)
        .inspect_err(|e| tracing::error!("vendor suffix pattern rejected: {e}"))
        .ok()
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    fn rule(from: &str, to: &str) -> Replacement {
        Replacement {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn site_config(root: &Path) -> Config {
        Config::default().with_root(root.to_path_buf())
    }

    #[test]
    fn later_rules_see_earlier_output() {
        let rules = vec![rule("../../Home/Home.html", "../index.html"), rule("../index.html", "../home.html")];
        let (out, changed) = rewrite("<a href=\"../../Home/Home.html\">", &rules);
        assert!(changed);
        assert_eq!(out, "<a href=\"../home.html\">");
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let rules = vec![
            rule("../resources/Resources.html", "../resources.html"),
            rule("web-files/", "assets/"),
        ];
        let text = "<a href=\"../resources/Resources.html\"><img src=\"web-files/a.png\">";
        let (once, changed) = rewrite(text, &rules);
        assert!(changed);
        let (twice, changed_again) = rewrite(&once, &rules);
        assert!(!changed_again);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_key_is_ignored() {
        let (out, changed) = rewrite("abc", &[rule("", "x")]);
        assert!(!changed);
        assert_eq!(out, "abc");
    }

    #[test]
    fn plan_relocates_strips_then_replaces() {
        let mut config = site_config(Path::new("/site"));
        config.relocations = vec![rule("../about/About.en-US.webpage.copy.html", "about/index.html")];
        config.replacements = vec![rule("../Home/Home.html", "../index.html")];
        let plan = MigrationPlan::new(&config);
        let doc = Document::new(Path::new("/site"), Path::new("/site/tools/risk.html"));

        let text = "<a href=\"../about/About.en-US.webpage.copy.html\">\
                    <a href=\"../Home/Home.en-US.webpage.copy.html\">\
                    <script src=\"Risk.en-US.webpage.copy.js\"></script>";
        let (out, changed) = plan.apply(&doc, text);
        assert!(changed);
        assert_eq!(
            out,
            "<a href=\"../about/index.html\">\
             <a href=\"../index.html\">\
             <script src=\"Risk.js\"></script>"
        );

        let (_, again) = plan.apply(&doc, &out);
        assert!(!again);
    }

    #[test]
    fn relocation_is_relative_to_each_document_depth() {
        let mut config = site_config(Path::new("/site"));
        config.relocations = vec![rule("../about/About.en-US.webpage.copy.html", "about/index.html")];
        let plan = MigrationPlan::new(&config);

        let deep = Document::new(Path::new("/site"), Path::new("/site/a/b/page.html"));
        let (out, _) = plan.apply(&deep, "<a href=\"../../about/About.en-US.webpage.copy.html#team\">");
        assert_eq!(out, "<a href=\"../../about/index.html#team\">");

        let top = Document::new(Path::new("/site"), Path::new("/site/index.html"));
        let (out, _) = plan.apply(&top, "<a href='about/About.en-US.webpage.copy.html'>");
        assert_eq!(out, "<a href='about/index.html'>");
    }

    #[test]
    fn relocation_leaves_longer_paths_alone() {
        let mut config = site_config(Path::new("/site"));
        config.relocations = vec![rule("about/About.html", "about/index.html")];
        let plan = MigrationPlan::new(&config);
        let doc = Document::new(Path::new("/site"), Path::new("/site/index.html"));

        let text = "<a href=\"old/about/About.html\">";
        let (out, changed) = plan.apply(&doc, text);
        assert!(!changed);
        assert_eq!(out, text);
    }

    #[test]
    fn custom_assets_move_into_asset_tree() {
        let config = site_config(Path::new("/site"));
        let plan = MigrationPlan::new(&config);
        let doc = Document::new(Path::new("/site"), Path::new("/site/tools/risk.html"));

        let text = "<script src=\"../web-pages/risk/Risk.en-US.customjs.js\"></script>\
                    <link href='/web-pages/Theme.en-US.customcss.css?v=3'>";
        let (out, changed) = plan.apply(&doc, text);
        assert!(changed);
        assert_eq!(
            out,
            "<script src=\"../assets/js/Risk.js\"></script>\
             <link href='../assets/css/Theme.css?v=3'>"
        );

        let (_, again) = plan.apply(&doc, &out);
        assert!(!again);
    }

    #[test]
    fn rewrite_tree_honors_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, "<a href=\"old.html\">").unwrap();
        let mut config = site_config(dir.path());
        config.replacements = vec![rule("old.html", "new.html")];

        let summary = rewrite_tree(&config, &config.rewrite_extensions, true, |_, text| rewrite(text, &config.replacements));
        assert_eq!(summary.modified, vec![PathBuf::from("index.html")]);
        assert_eq!(std::fs::read_to_string(&page).unwrap(), "<a href=\"old.html\">");

        let summary = rewrite_tree(&config, &config.rewrite_extensions, false, |_, text| rewrite(text, &config.replacements));
        assert_eq!(summary.scanned, 1);
        assert_eq!(std::fs::read_to_string(&page).unwrap(), "<a href=\"new.html\">");
    }

    #[test]
    fn undecodable_file_is_left_alone_and_rewrite_continues() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("a.html");
        let bytes = b"<a href=\"old.html\">\xff\xfe";
        std::fs::write(&bad, bytes).unwrap();
        let good = dir.path().join("b.html");
        std::fs::write(&good, "<a href=\"old.html\">").unwrap();
        let mut config = site_config(dir.path());
        config.replacements = vec![rule("old.html", "new.html")];

        let summary = rewrite_tree(&config, &config.rewrite_extensions, false, |_, text| rewrite(text, &config.replacements));
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, PathBuf::from("a.html"));
        assert_eq!(summary.modified, vec![PathBuf::from("b.html")]);
        assert_eq!(std::fs::read(&bad).unwrap(), bytes);
        assert_eq!(std::fs::read_to_string(&good).unwrap(), "<a href=\"new.html\">");
    }

    #[cfg(unix)]
    #[test]
    fn write_failure_is_recorded_and_rewrite_continues() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("a.html");
        std::fs::write(&locked, "<a href=\"old.html\">").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o444)).unwrap();
        let good = dir.path().join("b.html");
        std::fs::write(&good, "<a href=\"old.html\">").unwrap();

        // Privileged users write through read-only modes.
        if std::fs::OpenOptions::new().write(true).open(&locked).is_ok() {
            return;
        }

        let mut config = site_config(dir.path());
        config.replacements = vec![rule("old.html", "new.html")];
        let summary = rewrite_tree(&config, &config.rewrite_extensions, false, |_, text| rewrite(text, &config.replacements));

        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, PathBuf::from("a.html"));
        assert_eq!(summary.modified, vec![PathBuf::from("b.html")]);
        assert_eq!(std::fs::read_to_string(&locked).unwrap(), "<a href=\"old.html\">");
        assert_eq!(std::fs::read_to_string(&good).unwrap(), "<a href=\"new.html\">");
    }
}
