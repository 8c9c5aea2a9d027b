use std::path::{Path, PathBuf};

use crate::error::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".sitemigrate.toml";

/// Tool configuration loaded from `.sitemigrate.toml`.
/// The site root is an explicit value threaded into every command.
#[derive(Debug, Clone)]
pub struct Config {
    /// Custom stylesheet and script files moved into the asset tree.
    pub asset_relocations: Vec<AssetRelocation>,
    /// File extensions whose links are audited.
    pub audit_extensions: Vec<String>,
    /// Directory names skipped entirely during discovery.
    pub exclude: Vec<String>,
    /// Characters the emoji stripper leaves in place.
    pub keep_emoji: Vec<char>,
    /// Substrings identifying links into the old export layout.
    pub legacy_markers: Vec<String>,
    /// Old-path to root-relative new-path rules, written document-relative.
    pub relocations: Vec<Replacement>,
    /// Ordered exact-substring replacements.
    pub replacements: Vec<Replacement>,
    /// Optional report file, relative to the root.
    pub report: Option<PathBuf>,
    /// File extensions the rewriter and emoji tools touch.
    pub rewrite_extensions: Vec<String>,
    /// Site root every document lives under.
    pub root: PathBuf,
    /// Vendor filename infixes stripped from link targets.
    pub vendor_suffixes: Vec<String>,
}

/// One `from` -> `to` substring rule. Order in the file is application order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Replacement {
    /// Exact substring to look for.
    pub from: String,
    /// Substring written in its place.
    pub to: String,
}

/// Move `<Name><suffix>` files into `dir` (root-relative) as `<Name>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct AssetRelocation {
    /// Root-relative directory the renamed file now lives in.
    pub dir: PathBuf,
    /// Filename tail identifying the exported asset, extension included.
    pub suffix: String,
}

impl AssetRelocation {
    /// Extension kept on the renamed file, with its leading dot.
    pub fn extension(&self) -> &str {
        self.suffix.rfind('.').map_or("", |i| &self.suffix[i..])
    }
}

/// Raw TOML structure for `.sitemigrate.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct SitemigrateTomlConfig {
    audit_extensions: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    keep_emoji: Option<Vec<String>>,
    legacy_markers: Option<Vec<String>>,
    #[serde(default)]
    relocate: Vec<Replacement>,
    #[serde(default)]
    replace: Vec<Replacement>,
    report: Option<PathBuf>,
    relocate_asset: Option<Vec<AssetRelocation>>,
    rewrite_extensions: Option<Vec<String>>,
    root: Option<PathBuf>,
    vendor_suffixes: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_relocations: vec![
                AssetRelocation {
                    dir: PathBuf::from("assets/css"),
                    suffix: ".en-US.customcss.css".to_string(),
                },
                AssetRelocation {
                    dir: PathBuf::from("assets/js"),
                    suffix: ".en-US.customjs.js".to_string(),
                },
            ],
            audit_extensions: strings(&["html"]),
            exclude: strings(&["_legacy", "temp"]),
            keep_emoji: vec!['\u{26A0}', '\u{2717}', '\u{2713}'],
            legacy_markers: strings(&["web-pages", "web-templates"]),
            relocations: Vec::new(),
            replacements: Vec::new(),
            report: None,
            rewrite_extensions: strings(&["html", "js"]),
            root: PathBuf::from("."),
            vendor_suffixes: strings(&[".en-US.webpage.copy"]),
        }
    }
}

impl Config {
    /// Load config from `explicit` if given, else from `.sitemigrate.toml` in `cwd`.
    /// A missing default file yields the built-in defaults; a missing explicit
    /// file is an error. A file that exists but is malformed is always an error.
    ///
    /// Relative `root` values resolve against the directory holding the config.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` for a missing explicit path,
    /// `Error::Io` if reading fails, or `Error::TomlDe` if the TOML is malformed.
    pub fn load(cwd: &Path, explicit: Option<&Path>) -> Result<Self, Error> {
        let path = explicit.map_or_else(|| cwd.join(CONFIG_FILE), Path::to_path_buf);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit.is_some() {
                    return Err(Error::ConfigNotFound { path });
                }
                tracing::debug!("no {CONFIG_FILE} in {}, using defaults", cwd.display());
                let mut config = Self::default();
                config.root = cwd.join(&config.root);
                return Ok(config);
            },
            Err(e) => return Err(Error::Io(e)),
        };

        let base = path.parent().unwrap_or(cwd);
        let config = Self::parse(&content, base)?;
        tracing::debug!("loaded {}", path.display());
        Ok(config)
    }

    /// Parse config text, filling unspecified keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str, base: &Path) -> Result<Self, Error> {
        let raw: SitemigrateTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let keep_emoji = raw.keep_emoji.map_or(defaults.keep_emoji, |kept| {
            // "⚠️" arrives as two chars; the variation selector is never stripped anyway.
            kept.iter().flat_map(|s| s.chars()).filter(|c| *c != '\u{FE0F}').collect()
        });

        Ok(Self {
            asset_relocations: raw.relocate_asset.unwrap_or(defaults.asset_relocations),
            audit_extensions: raw.audit_extensions.unwrap_or(defaults.audit_extensions),
            exclude: raw.exclude.unwrap_or(defaults.exclude),
            keep_emoji,
            legacy_markers: raw.legacy_markers.unwrap_or(defaults.legacy_markers),
            relocations: raw.relocate,
            replacements: raw.replace,
            report: raw.report,
            rewrite_extensions: raw.rewrite_extensions.unwrap_or(defaults.rewrite_extensions),
            root: base.join(raw.root.unwrap_or(defaults.root)),
            vendor_suffixes: raw.vendor_suffixes.unwrap_or(defaults.vendor_suffixes),
        })
    }

    /// Replace the configured root, e.g. from `--root` on the command line.
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = root;
        self
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::RootNotFound` otherwise.
    pub fn ensure_root(&self) -> Result<(), Error> {
        if self.root.is_dir() {
            return Ok(());
        }
        Err(Error::RootNotFound {
            path: self.root.clone(),
        })
    }

    /// Absolute location of the report file, if one is configured.
    pub fn report_path(&self) -> Option<PathBuf> {
        self.report.as_ref().map(|r| self.root.join(r))
    }
}

/// Own a list of string literals.
fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
