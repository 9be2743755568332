// src/services/embedding_pipeline.rs

//! Lazy embedding cache for tour summaries and heritage-guide chunks.
//!
//! Nothing is embedded eagerly: callers hand in documents and the pipeline
//! probes the vector index for each logical id first, embedding and writing
//! only what is missing. Concurrent callers may both compute an embedding
//! for the same id, but the probe-before-write (and the deterministic point
//! id underneath) keeps storage at-most-once.

use crate::errors::AppError;
use crate::llm::EmbeddingClient;
use crate::models::Tour;
use crate::text_processing::TextChunk;
use crate::vector_db::{VectorCollection, VectorRecord, VectorSearchStore};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const UPSERT_BATCH_SIZE: usize = 100;

/// Discriminator stamped on heritage chunk payloads.
pub const HERITAGE_GUIDE_TYPE: &str = "heritage_guide";

/// Logical vector id of one heritage chunk.
pub fn heritage_chunk_id(tour_id: &str, chunk_index: usize) -> String {
    format!("{}_heritageGuide_{}", tour_id, chunk_index)
}

/// Payload stored alongside each heritage chunk embedding. Field names match
/// the catalog wire format used by the tour payloads.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HeritageChunkMetadata {
    pub place: String,
    #[serde(rename = "tourId")]
    pub tour_id: String,
    #[serde(rename = "heritageGuide")]
    pub heritage_guide: String,
    pub chunk_index: usize,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub raw_text: String,
}

pub struct EmbeddingPipeline {
    embedding_client: Arc<dyn EmbeddingClient>,
    vector_store: Arc<dyn VectorSearchStore>,
}

impl EmbeddingPipeline {
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorSearchStore>,
    ) -> Self {
        Self {
            embedding_client,
            vector_store,
        }
    }

    async fn existing_ids(
        &self,
        collection: VectorCollection,
        ids: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let present = self.vector_store.fetch(collection, ids).await?;
        Ok(present.into_iter().map(|(id, _)| id).collect())
    }

    async fn upsert_batched(
        &self,
        collection: VectorCollection,
        records: Vec<VectorRecord>,
    ) -> Result<(), AppError> {
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            self.vector_store.upsert(collection, batch.to_vec()).await?;
        }
        Ok(())
    }

    /// Ensures every tour in `tours` has a vector entry, embedding only the
    /// ones the existence probe reports as missing. Returns how many entries
    /// were written.
    #[instrument(skip_all, fields(count = tours.len()))]
    pub async fn index_tours(&self, tours: &[Tour]) -> Result<usize, AppError> {
        let ids: Vec<String> = tours
            .iter()
            .filter(|tour| !tour.tour_id.is_empty())
            .map(|tour| tour.tour_id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let existing = self.existing_ids(VectorCollection::Tours, &ids).await?;

        let mut records = Vec::new();
        for tour in tours {
            if tour.tour_id.is_empty() || existing.contains(&tour.tour_id) {
                continue;
            }

            let vector = match self
                .embedding_client
                .embed_content(&tour.summary_text(), "RETRIEVAL_DOCUMENT")
                .await
            {
                Ok(vector) => vector,
                Err(e) => {
                    // Skip this tour; it will be retried the next time the
                    // probe misses it.
                    error!(error = %e, tour_id = %tour.tour_id, "Failed to embed tour summary");
                    continue;
                }
            };

            records.push(VectorRecord {
                id: tour.tour_id.clone(),
                vector,
                payload: tour.to_vector_payload()?,
            });
        }

        if records.is_empty() {
            return Ok(0);
        }

        let written = records.len();
        info!("Indexing {} new tour summaries", written);
        self.upsert_batched(VectorCollection::Tours, records).await?;
        Ok(written)
    }

    /// Embeds the heritage chunks of `tour` that are not yet indexed. The
    /// per-chunk existence check makes a racing cold path idempotent even
    /// when the caller's whole-guide probe was stale.
    #[instrument(skip_all, fields(tour_id = %tour.tour_id, chunks = chunks.len()))]
    pub async fn index_heritage_chunks(
        &self,
        tour: &Tour,
        chunks: &[TextChunk],
    ) -> Result<usize, AppError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = (0..chunks.len())
            .map(|index| heritage_chunk_id(&tour.tour_id, index))
            .collect();
        let existing = self
            .existing_ids(VectorCollection::HeritageGuides, &ids)
            .await?;

        let mut records = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let chunk_id = heritage_chunk_id(&tour.tour_id, index);
            if existing.contains(&chunk_id) {
                continue;
            }

            let vector = match self
                .embedding_client
                .embed_content(&chunk.content, "RETRIEVAL_DOCUMENT")
                .await
            {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(error = %e, chunk_id = %chunk_id, "Failed to embed heritage chunk, skipping");
                    continue;
                }
            };

            let metadata = HeritageChunkMetadata {
                place: tour.place.clone(),
                tour_id: tour.tour_id.clone(),
                heritage_guide: tour.heritage_guide.clone(),
                chunk_index: index,
                doc_type: HERITAGE_GUIDE_TYPE.to_string(),
                raw_text: chunk.content.clone(),
            };

            records.push(VectorRecord {
                id: chunk_id,
                vector,
                payload: serde_json::to_value(metadata)?,
            });
        }

        if records.is_empty() {
            return Ok(0);
        }

        let written = records.len();
        info!("Indexing {} new heritage chunks", written);
        self.upsert_batched(VectorCollection::HeritageGuides, records)
            .await?;
        Ok(written)
    }
}
