//! Error types for the query executor

use thiserror::Error;

/// Errors that end a query before a result can be produced.
///
/// Non-200 responses are not errors here; they come back as
/// [`ODataResult::Failure`](crate::models::ODataResult::Failure).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// No API key was supplied; nothing was sent
    #[error("API key is missing. Enter your key from api.sap.com first")]
    MissingCredential,

    /// Transport, timeout or decoding failure
    #[error("Request error: {0}")]
    Request(String),

    /// Entity set name outside the supported set
    #[error("Unsupported entity set: {0}")]
    UnsupportedEntity(String),
}

impl QueryError {
    /// Creates a request error from anything printable.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Short label for status bars and notices.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingCredential => "Missing API key",
            Self::Request(_) => "Request error",
            Self::UnsupportedEntity(_) => "Invalid entity",
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Request(format!("request timed out: {}", err))
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Request(format!("failed to parse JSON response: {}", err))
    }
}
