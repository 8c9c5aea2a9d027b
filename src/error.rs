/// Crate-level error types for sitemigrate diagnostics.
use std::path::PathBuf;

/// Every error names the file or directory involved so a report line is
/// actionable without re-running under a debugger.
///
/// A link that points at a missing file is not an error: that outcome is
/// `Resolution::Unresolved`. These variants cover the tool itself failing.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An explicitly requested config file does not exist.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// Listing a directory failed while looking for a case-insensitive match.
    #[error("cannot list directory {}: {source}", path.display())]
    DirectoryUnreadable {
        /// Directory that could not be listed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// The file exists but its bytes are not valid UTF-8.
    #[error("not valid UTF-8 text: {}", path.display())]
    NotUtf8 {
        /// File that failed to decode.
        path: PathBuf,
    },

    /// Reading a document failed for a reason other than decoding.
    #[error("cannot read {}: {source}", path.display())]
    ReadFailed {
        /// File that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configured site root does not exist or is not a directory.
    #[error("site root not found: {}", path.display())]
    RootNotFound {
        /// The configured root.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// Writing a rewritten document or a report failed.
    #[error("cannot write {}: {source}", path.display())]
    WriteFailed {
        /// File that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
