//! # Document store seam
//!
//! The hosted document database, reduced to the operations the app actually
//! consumes: point reads and writes on named collections, auto-id appends,
//! and collection queries with one equality filter and an optional
//! descending order.
//!
//! Writes are single-document only. There is no multi-document transaction
//! and no conditional update, so callers layering invariants over several
//! documents get best-effort semantics under concurrent sessions.
//!
//! Collections are addressed by slash-joined paths, e.g. `books` or
//! `books/{id}/bookHistory` for a sub-collection.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub type Fields = serde_json::Map<String, Value>;

/// A stored document: its id within the collection plus a flat field map.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    Missing { collection: String, id: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Writes the full document, replacing whatever was there.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Merges the given fields into an existing document. Fails with
    /// [`StoreError::Missing`] when the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Idempotent; deleting an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Creates a document under a fresh id and returns that id. When
    /// `server_time_field` is given, that field is set to the store's own
    /// write time, monotonic per write.
    async fn add(
        &self,
        collection: &str,
        fields: Fields,
        server_time_field: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Equality filter only; a `Value::Null` filter value matches documents
    /// where the field is null or absent. `descending` orders by that field,
    /// newest first.
    async fn query(
        &self,
        collection: &str,
        filter: Option<(&str, Value)>,
        descending: Option<&str>,
    ) -> Result<Vec<Document>, StoreError>;
}
