//! Document-store capability interface consumed by the services.
//!
//! Services hold a [`SharedStore`] per entity type; the concrete binding is
//! chosen at construction time ([`MongoStore`] in production, [`MemoryStore`]
//! in tests and local runs).

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use thiserror::Error;

use crate::models::Entity;
use crate::query::Filter;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),
    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),
    #[error("write rejected: {0}")]
    Write(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Sort, projection and paging applied by [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

/// One entry of a batched update: add each amount to its field on the first
/// document matching `filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct Increment {
    pub filter: Filter,
    pub amounts: Vec<(String, i64)>,
}

impl Increment {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            amounts: Vec::new(),
        }
    }

    pub fn by(mut self, field: impl Into<String>, amount: i64) -> Self {
        self.amounts.push((field.into(), amount));
        self
    }

    pub fn to_update(&self) -> Document {
        let mut inc = Document::new();
        for (field, amount) in &self.amounts {
            inc.insert(field.clone(), *amount);
        }
        doc! { "$inc": inc }
    }
}

/// Result of a group-and-average aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStats {
    pub average: f64,
    pub count: i64,
}

#[async_trait]
pub trait DocumentStore<T: Entity>: Send + Sync {
    /// Raw documents, since a projection may drop fields `T` requires.
    async fn find(&self, filter: &Filter, options: FindOptions) -> StoreResult<Vec<Document>>;

    async fn count(&self, filter: &Filter) -> StoreResult<u64>;

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        self.find_one(&Filter::by_id(id)).await
    }

    async fn create(&self, entity: &T) -> StoreResult<T>;

    /// `$set`s `changes` (plus `updatedAt`) and returns the updated entity.
    async fn update_by_id(&self, id: &str, changes: Document) -> StoreResult<Option<T>>;

    /// Overwrites the stored entity with the same id.
    async fn replace(&self, entity: &T) -> StoreResult<Option<T>>;

    async fn delete_one(&self, filter: &Filter) -> StoreResult<Option<T>>;

    async fn delete_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        self.delete_one(&Filter::by_id(id)).await
    }

    /// Applies every increment as one batched write. Returns the number of
    /// modified documents.
    async fn bulk_update(&self, increments: Vec<Increment>) -> StoreResult<u64>;

    /// Mean and count of `field` over the documents matching `filter`, or
    /// `None` when nothing matches.
    async fn group_average(&self, filter: &Filter, field: &str) -> StoreResult<Option<GroupStats>>;

    /// Appends `value` to the array `field` unless already present.
    async fn add_to_set(&self, id: &str, field: &str, value: Bson) -> StoreResult<Option<T>>;

    /// Removes every element of the array `field` matching `condition`. A
    /// document condition matches sub-documents on the listed keys.
    async fn pull(&self, id: &str, field: &str, condition: Bson) -> StoreResult<Option<T>>;
}

pub type SharedStore<T> = Arc<dyn DocumentStore<T>>;
