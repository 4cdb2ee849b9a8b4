//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup, the turn loop and
//! the snapshot, so `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: intrigue_core::ConfigError,
    },

    /// A turn could not be run.
    #[error("turn error: {source}")]
    Turn {
        /// The underlying turn error.
        #[from]
        source: intrigue_core::TurnError,
    },

    /// The diagnostic subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },

    /// The world snapshot could not be encoded.
    #[error("snapshot encoding failed: {source}")]
    Encode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The world snapshot could not be written.
    #[error("failed to write snapshot to {}: {source}", path.display())]
    Snapshot {
        /// Where the snapshot was going.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
