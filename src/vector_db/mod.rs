//! Vector index access.
//!
//! Two logical collections back semantic search: whole-tour summaries and
//! heritage-guide text chunks. Services address vector entries by *logical*
//! id (`tour_id`, or `{tourId}_heritageGuide_{i}`); the Qdrant adapter maps
//! those deterministically onto point UUIDs, which is what makes re-indexing
//! idempotent at the storage layer.

pub mod qdrant_client;

use crate::errors::AppError;
use async_trait::async_trait;

pub use self::qdrant_client::QdrantVectorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorCollection {
    Tours,
    HeritageGuides,
}

/// One embedding plus its JSON payload, keyed by logical id.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// Metadata-equality filters for a nearest-neighbor query. Every field is
/// conjunctive; `max_price` becomes a strict less-than range condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub doc_type: Option<String>,
    pub place: Option<String>,
    pub max_price: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub score: f32,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait VectorSearchStore: Send + Sync {
    /// Creates any missing collection. Called once at startup.
    async fn ensure_collections(&self) -> Result<(), AppError>;

    /// Writes records by logical id. Writing the same id twice replaces the
    /// point rather than duplicating it, but callers are still expected to
    /// probe with [`fetch`](Self::fetch) first and skip ids that exist,
    /// since embedding computation is the expensive part.
    async fn upsert(
        &self,
        collection: VectorCollection,
        records: Vec<VectorRecord>,
    ) -> Result<(), AppError>;

    /// Point lookup by logical id; the existence probe. Returns only the ids
    /// that are present, with their payloads.
    async fn fetch(
        &self,
        collection: VectorCollection,
        ids: &[String],
    ) -> Result<Vec<(String, serde_json::Value)>, AppError>;

    /// Filtered nearest-neighbor query with offset pagination.
    async fn search(
        &self,
        collection: VectorCollection,
        query_vector: Vec<f32>,
        filter: SearchFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<VectorHit>, AppError>;
}
