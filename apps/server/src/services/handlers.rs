use bson::Document;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};
use crate::models::Entity;
use crate::query::{self, Filter, PaginationResult, QueryRequest};
use crate::store::SharedStore;

/// Body of every list operation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub results: usize,
    pub pagination_result: PaginationResult,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Document>,
}

/// List/get/create/update/delete over one entity type.
pub struct ResourceHandler<T: Entity> {
    store: SharedStore<T>,
}

impl<T: Entity> Clone for ResourceHandler<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T: Entity> ResourceHandler<T> {
    pub fn new(store: SharedStore<T>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore<T> {
        &self.store
    }

    pub async fn list(
        &self,
        base: &Filter,
        request: &QueryRequest,
        search_field: &str,
    ) -> AppResult<ListResponse> {
        let (data, pagination_result) =
            query::execute(self.store.as_ref(), base, request, search_field).await?;

        tracing::info!("{} list - returning {} documents", T::COLLECTION, data.len());
        Ok(ListResponse {
            results: data.len(),
            pagination_result,
            data,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<T> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| missing::<T>(id))
    }

    /// Inserts as given; payload validation happens before this call.
    pub async fn create(&self, payload: T) -> AppResult<T> {
        let created = self.store.create(&payload).await?;
        tracing::info!("{} create - id: {}", T::COLLECTION, created.id());
        Ok(created)
    }

    /// Merges `payload` into the stored document. The identity field is
    /// never overwritten.
    pub async fn update_by_id(&self, id: &str, mut payload: Document) -> AppResult<T> {
        payload.remove("id");
        payload.remove("_id");

        let updated = self
            .store
            .update_by_id(id, payload)
            .await?
            .ok_or_else(|| missing::<T>(id))?;

        tracing::info!("{} update - id: {}", T::COLLECTION, id);
        Ok(updated)
    }

    /// Removes the document and hands it back so lifecycle follow-ups can
    /// inspect it; callers answer with no content.
    pub async fn delete_by_id(&self, id: &str) -> AppResult<T> {
        let removed = self
            .store
            .delete_by_id(id)
            .await?
            .ok_or_else(|| missing::<T>(id))?;

        tracing::info!("{} delete - id: {}", T::COLLECTION, id);
        Ok(removed)
    }
}

fn missing<T: Entity>(id: &str) -> AppError {
    AppError::not_found(format!("No document in {} for id {}", T::COLLECTION, id))
}
