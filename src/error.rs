/// Crate-level error types for settingsref diagnostics.
use std::path::PathBuf;

/// Every error carries enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, position, or reason for failure.
///
/// Per-reference problems (unknown keys, non-public access) are not errors;
/// they are reported as `diagnostics::Diagnostic` values.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A config file named on the command line does not exist.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// A source document to analyse does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A `LINE:COL` argument is malformed or outside the document.
    #[error("invalid position `{position}` in {}", file.display())]
    InvalidPosition {
        /// Document the position was meant for.
        file: PathBuf,
        /// The position as given.
        position: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of command output failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde error.
        #[from]
        serde_json::Error,
    ),

    /// The settings file exists but is not valid JSON.
    #[error("malformed settings file {}: {reason}", path.display())]
    MalformedSettings {
        /// Path to the settings file.
        path: PathBuf,
        /// Parser message, including line and column.
        reason: String,
    },

    /// A scanner pattern failed to compile for the configured namespace.
    #[error("invalid reference pattern: {0}")]
    Pattern(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// TOML deserialization of `.settingsref.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The filesystem watcher could not be set up.
    #[error("watch: {0}")]
    Watch(
        /// The wrapped notify error.
        #[from]
        notify::Error,
    ),
}
