//! Error types for the hark gateway

use thiserror::Error;

/// Result type alias for hark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the hark gateway
///
/// Only fatal conditions live here. Per-cycle outcomes (no phrase matched,
/// execution timeout, non-zero exit) are reported through
/// [`crate::command::ExecutionResult`] and never terminate the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Transcript source cannot be obtained (fatal)
    #[error("transcript source error: {0}")]
    Source(String),

    /// Wake word gate error
    #[error("wake word error: {0}")]
    WakeWord(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
