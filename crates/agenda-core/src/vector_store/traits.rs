//! Vector store trait definitions

use async_trait::async_trait;

use super::types::{NewPoint, ScoredPoint};
use crate::error::Result;

/// Trait for vector store backends bound to a single collection
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Similarity search, returning at most `limit` points with payload
    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredPoint>>;

    /// Page through the collection without a query vector
    async fn scroll(&self, limit: usize) -> Result<Vec<ScoredPoint>>;

    /// Check whether the collection exists
    async fn collection_exists(&self) -> Result<bool>;

    /// Create the collection with cosine distance
    async fn create_collection(&self, vector_size: u64) -> Result<()>;

    /// Delete the collection
    async fn delete_collection(&self) -> Result<()>;

    /// Insert or replace points
    async fn upsert(&self, points: Vec<NewPoint>) -> Result<()>;

    /// Name of the collection this store is bound to
    fn collection(&self) -> &str;
}
