//! Unified error handling for backend requests.

use serde::Deserialize;
use thiserror::Error;

/// Structured error payload returned by the backend.
///
/// Strapi wraps failures as `{ "data": null, "error": { ... } }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendError {
    /// HTTP status echoed by the backend.
    #[serde(default)]
    pub status: Option<u16>,
    /// Error class (e.g. `ValidationError`, `UnauthorizedError`).
    #[serde(default)]
    pub name: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Extra details (validation errors per field, ...).
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Error envelope as found in a failed response body.
#[derive(Debug, Deserialize)]
pub(crate) struct BackendErrorBody {
    #[serde(default)]
    pub error: Option<BackendError>,
}

impl BackendErrorBody {
    /// Extract the structured payload from a raw body, if there is one.
    pub(crate) fn parse(body: &[u8]) -> Option<BackendError> {
        serde_json::from_slice::<Self>(body).ok().and_then(|b| b.error)
    }
}

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connectivity, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the session token. The session has already been
    /// cleared by the time this error is returned.
    #[error("Unauthorized: {}", message_or(.0.as_ref(), "session rejected"))]
    Unauthorized(Option<BackendError>),

    /// The backend answered with a non-success status.
    #[error("Backend error ({status}): {}", message_or(.error.as_ref(), "no details"))]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Structured payload, when the body carried one.
        error: Option<BackendError>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The response parsed but lacked a field the adapter relies on.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    /// The backend's own error message, when the failure carried one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(error) | Self::Backend { error, .. } => error
                .as_ref()
                .and_then(|e| e.message.as_deref())
                .filter(|m| !m.is_empty()),
            _ => None,
        }
    }

    /// The HTTP status associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Backend { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the request timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

fn message_or<'a>(error: Option<&'a BackendError>, fallback: &'a str) -> &'a str {
    error
        .and_then(|e| e.message.as_deref())
        .unwrap_or(fallback)
}
