//! Record identifiers.
//!
//! The admin framework identifies records by either a number or a string.
//! Strapi's `documentId` is always a string, but numeric IDs still show up
//! for users and legacy rows, so both shapes are accepted.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record identifier: a number or an opaque string.
///
/// Serializes without a tag, so `5` and `"5"` round-trip as themselves.
///
/// ```
/// use repair_desk_core::Identifier;
///
/// assert_eq!(Identifier::from("abc").to_string(), "abc");
/// assert_eq!(Identifier::from(5).to_string(), "5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Numeric identifier.
    Number(i64),
    /// String identifier (e.g. a Strapi `documentId`).
    Text(String),
}

impl Identifier {
    /// Read an identifier out of a JSON value.
    ///
    /// Returns `None` for anything that is not an integer or a string.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Number),
            _ => None,
        }
    }

    /// Convert into a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => Value::from(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_untagged_serde() {
        let text: Identifier = serde_json::from_value(json!("k2x9")).unwrap();
        assert_eq!(text, Identifier::Text("k2x9".to_string()));

        let number: Identifier = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(number, Identifier::Number(42));

        assert_eq!(serde_json::to_value(&number).unwrap(), json!(42));
        assert_eq!(serde_json::to_value(&text).unwrap(), json!("k2x9"));
    }

    #[test]
    fn test_from_json_rejects_other_shapes() {
        assert!(Identifier::from_json(&json!(null)).is_none());
        assert!(Identifier::from_json(&json!(1.5)).is_none());
        assert!(Identifier::from_json(&json!({"id": 1})).is_none());
    }

    #[test]
    fn test_to_json_round_trip() {
        let id = Identifier::from("5");
        assert_eq!(Identifier::from_json(&id.to_json()), Some(id));
    }
}
