//! Data-provider parameters and results.
//!
//! These mirror the generic list/get/create/update/delete contract the admin
//! framework speaks. They carry no backend conventions; translating them into
//! Strapi query strings is the adapter's job.

use core::fmt;
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Identifier, Record};

/// Errors that can occur when parsing parameters from text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    /// The sort expression has no field.
    #[error("sort field cannot be empty")]
    EmptySortField,
    /// The sort order is neither `ASC` nor `DESC`.
    #[error("invalid sort order: {0} (expected ASC or DESC)")]
    InvalidSortOrder(String),
}

/// Page request. Pages are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Page number.
    pub page: u32,
    /// Records per page.
    pub per_page: u32,
}

impl Pagination {
    /// Create a page request.
    #[must_use]
    pub const fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(ParamsError::InvalidSortOrder(s.to_owned())),
        }
    }
}

/// Sort request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Field to sort by.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

impl Sort {
    /// Create a sort request.
    #[must_use]
    pub fn new(field: &str, order: SortOrder) -> Self {
        Self {
            field: field.to_owned(),
            order,
        }
    }
}

/// Parses `field` or `field:ASC` / `field:DESC`.
///
/// ```
/// use repair_desk_core::{Sort, SortOrder};
///
/// let sort: Sort = "name:DESC".parse().unwrap();
/// assert_eq!(sort, Sort::new("name", SortOrder::Desc));
///
/// let sort: Sort = "createdAt".parse().unwrap();
/// assert_eq!(sort.order, SortOrder::Asc);
/// ```
impl FromStr for Sort {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, order) = match s.rsplit_once(':') {
            Some((field, order)) => (field, order.parse()?),
            None => (s, SortOrder::Asc),
        };

        if field.is_empty() {
            return Err(ParamsError::EmptySortField);
        }

        Ok(Self::new(field, order))
    }
}

/// Filter values keyed by field name.
///
/// A `null` or empty-string value means "no filter" for that field.
pub type Filter = BTreeMap<String, Value>;

/// Parameters for `get_list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetListParams {
    /// Page request.
    pub pagination: Option<Pagination>,
    /// Sort request.
    pub sort: Option<Sort>,
    /// Field filters.
    #[serde(default)]
    pub filter: Filter,
}

/// Parameters for `get_one`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOneParams {
    /// Record to fetch.
    pub id: Identifier,
}

/// Parameters for `get_many`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetManyParams {
    /// Records to fetch.
    pub ids: Vec<Identifier>,
}

/// Parameters for `get_many_reference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetManyReferenceParams {
    /// Foreign-key field on the listed resource.
    pub target: String,
    /// Identifier the foreign key must equal.
    pub id: Identifier,
    /// Pagination, sort and filters applied on top.
    #[serde(flatten)]
    pub list: GetListParams,
}

/// Parameters for `create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateParams {
    /// New record payload.
    pub data: Value,
}

/// Parameters for `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    /// Record to update.
    pub id: Identifier,
    /// Changed fields.
    pub data: Value,
    /// Record as last read, if the caller has it.
    #[serde(default)]
    pub previous_data: Option<Record>,
}

/// Parameters for `update_many`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateManyParams {
    /// Records to update.
    pub ids: Vec<Identifier>,
    /// Changed fields, applied to every record.
    pub data: Value,
}

/// Parameters for `delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    /// Record to delete.
    pub id: Identifier,
    /// Record as last read, if the caller has it.
    #[serde(default)]
    pub previous_data: Option<Record>,
}

/// Parameters for `delete_many`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteManyParams {
    /// Records to delete.
    pub ids: Vec<Identifier>,
}

/// Result of `get_list` and `get_many_reference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetListResult {
    /// Records on the requested page.
    pub data: Vec<Record>,
    /// Total matching records across all pages.
    pub total: u64,
}

/// Result of `get_many`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetManyResult {
    /// Records found.
    pub data: Vec<Record>,
}

/// Result of single-record operations (`get_one`, `create`, `update`, `delete`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    /// The record.
    pub data: Record,
}

/// Result of `update_many` and `delete_many`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiersResult {
    /// Identifiers of the affected records.
    pub data: Vec<Identifier>,
}
