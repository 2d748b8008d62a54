//! Error types for the analysis session

use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving an analysis session
#[derive(Error, Debug)]
pub enum Error {
    /// The browser process failed to launch
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Navigation did not complete (timeout, DNS failure, network error).
    /// Fatal per call; the caller owns any retry policy.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// In-page extraction failed (evaluation error, malformed probe payload)
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// CDP-level error
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Cdp(err.to_string())
    }
}
