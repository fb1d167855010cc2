//! Authenticated user record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Identifier;

/// The user returned by the backend alongside a JWT.
///
/// Passed through opaquely: nothing is validated locally, and any field
/// beyond `id`, `username` and `email` (`documentId`, `confirmed`,
/// `blocked`, timestamps, ...) is preserved in [`UserRecord::extra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Backend user ID.
    pub id: Identifier,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Email address, as stored by the backend.
    #[serde(default)]
    pub email: String,
    /// Remaining backend fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Create a user record with no extra fields.
    #[must_use]
    pub fn new(id: impl Into<Identifier>, username: &str, email: &str) -> Self {
        Self {
            id: id.into(),
            username: username.to_owned(),
            email: email.to_owned(),
            extra: Map::new(),
        }
    }
}
