//! Strapi v5 response envelopes.

use repair_desk_core::{Identifier, Record};
use serde::Deserialize;
use serde_json::Value;

/// Field Strapi v5 identifies documents by.
pub const DOCUMENT_ID: &str = "documentId";

/// `{ data: [...], meta: { pagination } }`
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub meta: ListMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub pagination: Option<PaginationMeta>,
}

/// Page information of a list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
    #[serde(default)]
    pub page_count: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// `{ data: {...}, meta: {} }`
#[derive(Debug, Deserialize)]
pub struct SingleResponse {
    #[serde(default)]
    pub data: Option<Record>,
}

/// Copy `documentId` onto `id`.
///
/// Records without a usable `documentId` keep whatever `id` they have.
#[must_use]
pub fn remap(mut record: Record) -> Record {
    if let Some(document_id) = record.get(DOCUMENT_ID).filter(|v| !v.is_null()).cloned() {
        record.insert("id", document_id);
    }
    record
}

/// The record's `documentId`, if it is a well-formed identifier.
#[must_use]
pub fn document_id(record: &Record) -> Option<Identifier> {
    record.get(DOCUMENT_ID).and_then(Identifier::from_json)
}

/// Stand-in for a deleted record when the backend returned no body.
#[must_use]
pub fn placeholder(id: &Identifier) -> Record {
    let mut record = Record::new();
    record.insert("id", id.to_json());
    record.insert(DOCUMENT_ID, id.to_json());
    record
}

/// Wrap a write payload as `{ "data": ... }`.
#[must_use]
pub fn write_body(data: &Value) -> Value {
    serde_json::json!({ "data": data })
}
