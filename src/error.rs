//! Error types for listforge.

use thiserror::Error;

/// Error type for listforge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing or unparseable config, empty run)
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote source fetch error
    #[error("fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Remote source answered with a non-success status
    #[error("HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Categorized dataset checkout is not available
    #[error("dataset unavailable: {0}")]
    DatasetUnavailable(String),
}

/// Result type alias for listforge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for single-line pattern normalization.
///
/// Always recoverable: the offending line is dropped, never the whole source.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Nothing left after stripping noise
    #[error("empty after cleanup")]
    Empty,

    /// Leftover regex metacharacters in a non-regexp line
    #[error("unsupported pattern syntax: {0}")]
    UnsupportedSyntax(String),

    /// Host part is missing or has no dot
    #[error("not a domain: {0}")]
    NotADomain(String),
}
