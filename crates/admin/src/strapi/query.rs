//! Strapi v5 query-string conventions.
//!
//! | Generic parameter | Query pair |
//! |-------------------|------------|
//! | `pagination.page` | `pagination[page]=N` |
//! | `pagination.perPage` | `pagination[pageSize]=N` |
//! | `sort {field, order}` | `sort=field:asc` or `sort=field:desc` |
//! | filter, string value | `filters[key][$containsi]=value` |
//! | filter, other value | `filters[key][$eq]=value` |
//! | `get_many` ids | `filters[documentId][$in][]=id`, once per id |
//! | reference `{target, id}` | `filters[target][documentId][$eq]=id` |

use repair_desk_core::{Filter, GetListParams, Identifier, Pagination, Sort, SortOrder};
use serde_json::Value;

use crate::http::QueryPairs;

/// Ordered query-string pairs for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryEnvelope {
    pairs: QueryPairs,
}

impl QueryEnvelope {
    /// An empty envelope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope for a list request: pagination, then sort, then filters.
    #[must_use]
    pub fn for_list(params: &GetListParams) -> Self {
        let mut envelope = Self::new();
        if let Some(pagination) = &params.pagination {
            envelope = envelope.pagination(pagination);
        }
        if let Some(sort) = &params.sort {
            envelope = envelope.sort(sort);
        }
        envelope.filters(&params.filter)
    }

    /// Add page number and page size.
    #[must_use]
    pub fn pagination(self, pagination: &Pagination) -> Self {
        self.push("pagination[page]", pagination.page.to_string())
            .push("pagination[pageSize]", pagination.per_page.to_string())
    }

    /// Add the sort expression.
    #[must_use]
    pub fn sort(self, sort: &Sort) -> Self {
        let value = format!("{}:{}", sort.field, sort_direction(sort.order));
        self.push("sort", value)
    }

    /// Add one pair per non-empty filter value.
    #[must_use]
    pub fn filters(mut self, filter: &Filter) -> Self {
        for (key, value) in filter {
            let Some(rendered) = filter_value(value) else {
                continue;
            };
            let operator = if value.is_string() { "$containsi" } else { "$eq" };
            self = self.push(&format!("filters[{key}][{operator}]"), rendered);
        }
        self
    }

    /// Add a `documentId` membership filter, one pair per identifier.
    #[must_use]
    pub fn document_ids(mut self, ids: &[Identifier]) -> Self {
        for id in ids {
            self = self.push("filters[documentId][$in][]", id.to_string());
        }
        self
    }

    /// Restrict to records whose `target` relation points at `id`.
    #[must_use]
    pub fn reference(self, target: &str, id: &Identifier) -> Self {
        self.push(
            &format!("filters[{target}][documentId][$eq]"),
            id.to_string(),
        )
    }

    /// The pairs, in insertion order.
    #[must_use]
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Consume into the pairs.
    #[must_use]
    pub fn into_pairs(self) -> QueryPairs {
        self.pairs
    }

    fn push(mut self, key: &str, value: String) -> Self {
        self.pairs.push((key.to_owned(), value));
        self
    }
}

/// Strapi's lowercase sort direction.
#[must_use]
pub const fn sort_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "asc",
        SortOrder::Desc => "desc",
    }
}

/// Text form of a filter value, or `None` when it means "no filter".
///
/// Strings pass through, numbers and booleans use their JSON text, arrays and
/// objects are compact JSON.
#[must_use]
pub fn filter_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
