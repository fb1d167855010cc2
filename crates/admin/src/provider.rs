//! The generic data-provider contract the console browses resources through.

use async_trait::async_trait;
use repair_desk_core::{
    CreateParams, DeleteManyParams, DeleteParams, GetListParams, GetListResult,
    GetManyParams, GetManyReferenceParams, GetManyResult, GetOneParams, IdentifiersResult,
    RecordResult, UpdateManyParams, UpdateParams,
};

use crate::error::ApiError;

/// CRUD operations over named resources.
///
/// Implementations translate the generic parameters into a concrete
/// backend's conventions. Every read path returns records carrying an `id`.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// One page of records, plus the total across all pages.
    async fn get_list(
        &self,
        resource: &str,
        params: &GetListParams,
    ) -> Result<GetListResult, ApiError>;

    /// A single record.
    async fn get_one(&self, resource: &str, params: &GetOneParams)
    -> Result<RecordResult, ApiError>;

    /// Several records by identifier, in one request.
    async fn get_many(
        &self,
        resource: &str,
        params: &GetManyParams,
    ) -> Result<GetManyResult, ApiError>;

    /// Records whose `target` field references `id`.
    async fn get_many_reference(
        &self,
        resource: &str,
        params: &GetManyReferenceParams,
    ) -> Result<GetListResult, ApiError>;

    /// Create a record.
    async fn create(&self, resource: &str, params: &CreateParams)
    -> Result<RecordResult, ApiError>;

    /// Update a record.
    async fn update(&self, resource: &str, params: &UpdateParams)
    -> Result<RecordResult, ApiError>;

    /// Apply the same change to several records. Fails as a whole on the
    /// first failed update; updates already applied stay applied.
    async fn update_many(
        &self,
        resource: &str,
        params: &UpdateManyParams,
    ) -> Result<IdentifiersResult, ApiError>;

    /// Delete a record.
    async fn delete(&self, resource: &str, params: &DeleteParams)
    -> Result<RecordResult, ApiError>;

    /// Delete several records. Same failure semantics as `update_many`.
    async fn delete_many(
        &self,
        resource: &str,
        params: &DeleteManyParams,
    ) -> Result<IdentifiersResult, ApiError>;
}
