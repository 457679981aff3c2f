//! Custom error types for rustresearcher.
//!
//! Configuration, connectivity and validation failures are raised before any
//! external call is made. Everything else is an upstream failure that is
//! propagated to the caller untouched: nothing in this crate retries.

use thiserror::Error;

/// Main error type for rustresearcher operations.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Required configuration is missing or invalid (e.g. no API key)
    #[error("Config error: {0}")]
    Config(String),

    /// Connectivity pre-check failed
    #[error("No internet connection: {0}")]
    Connectivity(String),

    /// Submission rejected locally before any external call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from API
        message: String,
    },

    /// Response could not be parsed, or a required field is missing
    #[error("Parse error: {0}")]
    Parse(String),

    /// Google Scholar served a CAPTCHA page instead of results
    #[error("CAPTCHA detected, Google Scholar blocked the request")]
    Captcha,

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResearchError {
    /// True for failures that happen before any external service is contacted.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Connectivity(_) | Self::Validation(_)
        )
    }
}

/// Result type alias using `ResearchError`
pub type Result<T> = std::result::Result<T, ResearchError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| ResearchError::Parse(msg.to_string()))
    }
}
