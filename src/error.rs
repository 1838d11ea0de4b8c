//! Error types for configuration composition.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while composing a build configuration.
///
/// All variants are fatal to the current invocation; nothing is retried
/// and no partial configuration is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller violated the composition contract.
    #[error("canopy-bundle-config expects {expected} for `{argument}`, received {received}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// Description of the expected value.
        expected: &'static str,
        /// Description of what was actually received.
        received: String,
    },

    /// A predicate externals rule failed while classifying a module.
    #[error("externals predicate failed for module '{module_id}': {source}")]
    RuleEvaluation {
        /// The module identifier that was being classified.
        module_id: String,
        /// The failure reported by the predicate.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An unexpected filesystem failure, distinct from simple not-found.
    #[error("failed to read {path}")]
    FileSystem {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
