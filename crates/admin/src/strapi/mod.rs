//! Strapi v5 resource adapter.
//!
//! Implements [`DataProvider`] over Strapi's REST conventions:
//!
//! - Resources live at `/:resource` and `/:resource/:documentId`
//! - Records are identified by `documentId`, which every read path copies
//!   onto the generic `id` field
//! - Write payloads are wrapped as `{ "data": ... }`
//! - Pagination, sort and filters are bracketed query pairs
//!   (see [`QueryEnvelope`])

mod query;
mod types;

pub use query::*;
pub use types::{DOCUMENT_ID, remap};

use async_trait::async_trait;
use futures::future::try_join_all;
use repair_desk_core::{
    CreateParams, DeleteManyParams, DeleteParams, GetListParams, GetListResult, GetManyParams,
    GetManyReferenceParams, GetManyResult, GetOneParams, Identifier, IdentifiersResult, Record,
    RecordResult, UpdateManyParams, UpdateParams,
};
use serde_json::Value;
use tracing::instrument;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::provider::DataProvider;

use types::{ListResponse, SingleResponse, document_id, placeholder, write_body};

/// [`DataProvider`] backed by a Strapi v5 REST API.
#[derive(Debug, Clone)]
pub struct StrapiProvider {
    api: ApiClient,
}

impl StrapiProvider {
    /// Adapter issuing requests through `api`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// The underlying HTTP client.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    async fn fetch_list(
        &self,
        resource: &str,
        envelope: QueryEnvelope,
    ) -> Result<GetListResult, ApiError> {
        let response: ListResponse = self
            .api
            .get(&[resource], envelope.as_pairs())
            .await?;

        let total = response
            .meta
            .pagination
            .and_then(|p| p.total)
            .ok_or_else(|| {
                ApiError::UnexpectedResponse(format!(
                    "list of '{resource}' has no meta.pagination.total"
                ))
            })?;

        Ok(GetListResult {
            data: response.data.into_iter().map(remap).collect(),
            total,
        })
    }

    async fn put_one(
        &self,
        resource: &str,
        id: &Identifier,
        data: &Value,
    ) -> Result<Record, ApiError> {
        let id = id.to_string();
        let response: SingleResponse = self
            .api
            .put(&[resource, id.as_str()], &write_body(data))
            .await?;
        single(response, resource)
    }

    async fn delete_one(&self, resource: &str, id: &Identifier) -> Result<Option<Record>, ApiError> {
        let id = id.to_string();
        let body = self.api.delete(&[resource, id.as_str()]).await?;
        let Some(body) = body else {
            return Ok(None);
        };
        let response: SingleResponse = serde_json::from_value(body)?;
        Ok(response.data.map(remap))
    }
}

#[async_trait]
impl DataProvider for StrapiProvider {
    #[instrument(skip(self, params))]
    async fn get_list(
        &self,
        resource: &str,
        params: &GetListParams,
    ) -> Result<GetListResult, ApiError> {
        self.fetch_list(resource, QueryEnvelope::for_list(params))
            .await
    }

    #[instrument(skip(self, params), fields(id = %params.id))]
    async fn get_one(
        &self,
        resource: &str,
        params: &GetOneParams,
    ) -> Result<RecordResult, ApiError> {
        let id = params.id.to_string();
        let response: SingleResponse = self
            .api
            .get(&[resource, id.as_str()], &[])
            .await?;

        Ok(RecordResult {
            data: single(response, resource)?,
        })
    }

    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    async fn get_many(
        &self,
        resource: &str,
        params: &GetManyParams,
    ) -> Result<GetManyResult, ApiError> {
        let envelope = QueryEnvelope::new().document_ids(&params.ids);
        let response: ListResponse = self
            .api
            .get(&[resource], envelope.as_pairs())
            .await?;

        Ok(GetManyResult {
            data: response.data.into_iter().map(remap).collect(),
        })
    }

    #[instrument(skip(self, params), fields(target = %params.target))]
    async fn get_many_reference(
        &self,
        resource: &str,
        params: &GetManyReferenceParams,
    ) -> Result<GetListResult, ApiError> {
        let envelope =
            QueryEnvelope::for_list(&params.list).reference(&params.target, &params.id);
        self.fetch_list(resource, envelope).await
    }

    #[instrument(skip(self, params))]
    async fn create(
        &self,
        resource: &str,
        params: &CreateParams,
    ) -> Result<RecordResult, ApiError> {
        let response: SingleResponse = self
            .api
            .post(&[resource], &write_body(&params.data))
            .await?;

        let data = single(response, resource)?;
        tracing::info!(resource, id = ?data.id(), "Record created");
        Ok(RecordResult { data })
    }

    #[instrument(skip(self, params), fields(id = %params.id))]
    async fn update(
        &self,
        resource: &str,
        params: &UpdateParams,
    ) -> Result<RecordResult, ApiError> {
        let data = self.put_one(resource, &params.id, &params.data).await?;
        Ok(RecordResult { data })
    }

    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    async fn update_many(
        &self,
        resource: &str,
        params: &UpdateManyParams,
    ) -> Result<IdentifiersResult, ApiError> {
        let updates = params.ids.iter().map(|id| async move {
            let record = self.put_one(resource, id, &params.data).await?;
            Ok::<_, ApiError>(document_id(&record).unwrap_or_else(|| id.clone()))
        });

        let data = try_join_all(updates).await?;
        tracing::info!(resource, count = data.len(), "Records updated");
        Ok(IdentifiersResult { data })
    }

    #[instrument(skip(self, params), fields(id = %params.id))]
    async fn delete(
        &self,
        resource: &str,
        params: &DeleteParams,
    ) -> Result<RecordResult, ApiError> {
        let data = match self.delete_one(resource, &params.id).await? {
            Some(record) => record,
            None => params
                .previous_data
                .clone()
                .map_or_else(|| placeholder(&params.id), remap),
        };

        tracing::info!(resource, id = %params.id, "Record deleted");
        Ok(RecordResult { data })
    }

    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    async fn delete_many(
        &self,
        resource: &str,
        params: &DeleteManyParams,
    ) -> Result<IdentifiersResult, ApiError> {
        let deletes = params
            .ids
            .iter()
            .map(|id| self.delete_one(resource, id));

        try_join_all(deletes).await?;
        tracing::info!(resource, count = params.ids.len(), "Records deleted");
        Ok(IdentifiersResult {
            data: params.ids.clone(),
        })
    }
}

fn single(response: SingleResponse, resource: &str) -> Result<Record, ApiError> {
    response.data.map(remap).ok_or_else(|| {
        ApiError::UnexpectedResponse(format!("response for '{resource}' has no data"))
    })
}
