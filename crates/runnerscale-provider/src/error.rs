//! Provider error types.
//!
//! The engine never retries. Errors are classified so the caller can decide
//! whether the next pass should back off or whether an operator must act.

use std::fmt;

use thiserror::Error;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// The kind of provider failure, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Server errors, rate limits, timeouts. Safe to retry with backoff.
    Transient,
    /// Authentication failures, malformed responses, other 4xx.
    Permanent,
    /// The repository or run does not exist (HTTP 404).
    NotFound,
}

impl ProviderErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, ProviderErrorKind::Transient)
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::Transient => write!(f, "transient"),
            ProviderErrorKind::Permanent => write!(f, "permanent"),
            ProviderErrorKind::NotFound => write!(f, "not found"),
        }
    }
}

/// A failure fetching runs or jobs from the provider.
#[derive(Debug, Clone, Error)]
#[error("{kind} provider error{}: {message}", status_suffix(.status_code))]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// HTTP status code, if the failure came from a response.
    pub status_code: Option<u16>,
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Transient,
            status_code: None,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Permanent,
            status_code: None,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            404 => ProviderErrorKind::NotFound,
            429 | 500..=599 => ProviderErrorKind::Transient,
            _ => ProviderErrorKind::Permanent,
        };
        Self {
            kind,
            status_code: Some(status),
            message: message.into(),
        }
    }

    /// A response body that did not decode.
    pub fn malformed(context: &str, err: serde_json::Error) -> Self {
        Self::permanent(format!("malformed {context} response: {err}"))
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}
