// src/services/tour_query_service.rs

//! Retrieval orchestration for `get_tours`, `get_registered_tours` and
//! `get_heritage_guide`.
//!
//! Read paths never raise: every backend failure is captured into a
//! well-formed `QueryPage` carrying an `error` field, so the controller can
//! keep the conversation going. The write path (registration) lives in
//! `registration_service` and fails loudly instead.

use crate::errors::AppError;
use crate::llm::EmbeddingClient;
use crate::models::tool_args::{GetHeritageGuideArgs, GetToursArgs};
use crate::models::tours::TOUR_INFO_TYPE;
use crate::models::{PaginationCursor, Tour};
use crate::services::embedding_pipeline::{heritage_chunk_id, EmbeddingPipeline};
use crate::storage::ObjectStore;
use crate::stores::{RegistrationStore, TourStore};
use crate::text_processing::{chunk_text, ChunkConfig, PdfExtract};
use crate::vector_db::{SearchFilter, VectorCollection, VectorSearchStore};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// A query that names a tour id directly is answered by a point lookup, not
/// a nearest-neighbor search.
static TOUR_ID_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:tour ?id|id)[:\s]+([a-zA-Z0-9-]+)").unwrap());

/// "under 600,000 VND" style phrases become a price range filter.
static MAX_PRICE_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)under\s+(\d+(?:,\d{3})*)\s*(?:vnd)?").unwrap());

/// One page of tool results. This is the exact shape handed back to the
/// language model as a tool response.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPage {
    pub results: Vec<serde_json::Value>,
    pub next_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryPage {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            next_token: None,
            error: None,
        }
    }

    pub fn of(results: Vec<serde_json::Value>, next_token: Option<String>) -> Self {
        Self {
            results,
            next_token,
            error: None,
        }
    }

    fn degraded(err: &AppError) -> Self {
        Self {
            results: Vec::new(),
            next_token: None,
            error: Some(err.to_string()),
        }
    }
}

pub struct TourQueryService {
    tour_store: Arc<dyn TourStore>,
    registration_store: Arc<dyn RegistrationStore>,
    vector_store: Arc<dyn VectorSearchStore>,
    embedding_client: Arc<dyn EmbeddingClient>,
    pipeline: Arc<EmbeddingPipeline>,
    object_store: Arc<dyn ObjectStore>,
    pdf_extractor: Arc<dyn PdfExtract>,
    chunk_config: ChunkConfig,
}

impl TourQueryService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tour_store: Arc<dyn TourStore>,
        registration_store: Arc<dyn RegistrationStore>,
        vector_store: Arc<dyn VectorSearchStore>,
        embedding_client: Arc<dyn EmbeddingClient>,
        pipeline: Arc<EmbeddingPipeline>,
        object_store: Arc<dyn ObjectStore>,
        pdf_extractor: Arc<dyn PdfExtract>,
        chunk_config: ChunkConfig,
    ) -> Self {
        Self {
            tour_store,
            registration_store,
            vector_store,
            embedding_client,
            pipeline,
            object_store,
            pdf_extractor,
            chunk_config,
        }
    }

    // --- get_tours ---

    #[instrument(skip(self, args))]
    pub async fn get_tours(&self, args: GetToursArgs) -> QueryPage {
        match self.get_tours_inner(args).await {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, "get_tours failed, returning degraded result");
                QueryPage::degraded(&e)
            }
        }
    }

    async fn get_tours_inner(&self, args: GetToursArgs) -> Result<QueryPage, AppError> {
        let search_query = args
            .search_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        match search_query {
            Some(query) => self.search_tours(query, &args).await,
            None => self.list_tours(&args).await,
        }
    }

    /// Semantic path: the structured store is never touched here.
    async fn search_tours(&self, query: &str, args: &GetToursArgs) -> Result<QueryPage, AppError> {
        // Queries that carry an explicit tour id short-circuit to a fetch.
        if let Some(captures) = TOUR_ID_QUERY.captures(query) {
            let tour_id = captures[1].to_string();
            let found = self
                .vector_store
                .fetch(VectorCollection::Tours, &[tour_id])
                .await?;
            let results = found.into_iter().map(|(_, payload)| payload).collect();
            return Ok(QueryPage::of(results, None));
        }

        let offset = match &args.pagination_token {
            Some(token) => PaginationCursor::decode(token)?.into_vector()?,
            None => 0,
        };

        let filter = SearchFilter {
            doc_type: Some(
                args.doc_type
                    .clone()
                    .unwrap_or_else(|| TOUR_INFO_TYPE.to_string()),
            ),
            place: args.place.clone(),
            max_price: parse_max_price(query),
        };

        let query_vector = self
            .embedding_client
            .embed_content(query, "RETRIEVAL_QUERY")
            .await?;

        let hits = self
            .vector_store
            .search(
                VectorCollection::Tours,
                query_vector,
                filter,
                args.page_size,
                offset,
            )
            .await?;

        let next_token = vector_next_token(hits.len() as u64, args.page_size, offset)?;
        let results = hits.into_iter().map(|hit| hit.payload).collect();
        Ok(QueryPage::of(results, next_token))
    }

    /// Structured path: partition query or full scan, plus lazy indexing of
    /// the served page so semantic search converges on catalog coverage.
    async fn list_tours(&self, args: &GetToursArgs) -> Result<QueryPage, AppError> {
        let exclusive_start = match &args.pagination_token {
            Some(token) => Some(PaginationCursor::decode(token)?.into_structured()?),
            None => None,
        };

        let page = match args.place.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(place) => {
                self.tour_store
                    .query_by_place(place, args.page_size, exclusive_start)
                    .await?
            }
            None => self.tour_store.scan(args.page_size, exclusive_start).await?,
        };

        // Best-effort: an unreachable vector index must not break listing.
        if let Err(e) = self.pipeline.index_tours(&page.tours).await {
            warn!(error = %e, "Lazy tour indexing failed, continuing without it");
        }

        let next_token = match page.last_evaluated_id {
            Some(last_tour_id) => {
                Some(PaginationCursor::Structured { last_tour_id }.encode()?)
            }
            None => None,
        };

        let results = page
            .tours
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryPage::of(results, next_token))
    }

    // --- get_registered_tours ---

    #[instrument(skip(self), fields(phone_number))]
    pub async fn get_registered_tours(&self, phone_number: &str) -> QueryPage {
        match self.registration_store.list_by_phone(phone_number).await {
            Ok(registrations) => {
                let results = registrations
                    .iter()
                    .filter_map(|registration| serde_json::to_value(registration).ok())
                    .collect();
                QueryPage::of(results, None)
            }
            Err(e) => {
                error!(error = %e, "get_registered_tours failed, returning degraded result");
                QueryPage::degraded(&e)
            }
        }
    }

    // --- get_heritage_guide ---

    #[instrument(skip(self, args), fields(place = %args.place))]
    pub async fn get_heritage_guide(&self, args: GetHeritageGuideArgs) -> QueryPage {
        match self.get_heritage_guide_inner(args).await {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, "get_heritage_guide failed, returning degraded result");
                QueryPage::degraded(&e)
            }
        }
    }

    async fn get_heritage_guide_inner(
        &self,
        args: GetHeritageGuideArgs,
    ) -> Result<QueryPage, AppError> {
        let place = args.place.trim();
        if place.is_empty() {
            // "No heritage data for this place" is a normal outcome.
            return Ok(QueryPage::empty());
        }

        let offset = match &args.pagination_token {
            Some(token) => PaginationCursor::decode(token)?.into_vector()?,
            None => 0,
        };

        let query_text = args
            .search_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Top 10 sites in {}", place));

        // One embedding serves both the tour resolution and the chunk search.
        let query_vector = self
            .embedding_client
            .embed_content(&query_text, "RETRIEVAL_QUERY")
            .await?;

        let Some(tour) = self.resolve_tour_for_place(place, query_vector.clone()).await? else {
            return Ok(QueryPage::empty());
        };

        let probe_id = heritage_chunk_id(&tour.tour_id, 0);
        let already_indexed = !self
            .vector_store
            .fetch(VectorCollection::HeritageGuides, &[probe_id])
            .await?
            .is_empty();

        if !already_indexed {
            if tour.heritage_guide.trim().is_empty() {
                info!(tour_id = %tour.tour_id, "Tour has no heritage guide reference");
                return Ok(QueryPage::empty());
            }
            // Cold path is best-effort: whatever got indexed is queried below.
            if let Err(e) = self.materialize_heritage_guide(&tour).await {
                warn!(error = %e, tour_id = %tour.tour_id, "Heritage guide indexing failed, continuing");
            }
        }

        let filter = SearchFilter {
            place: Some(tour.place.clone()),
            ..Default::default()
        };
        let hits = self
            .vector_store
            .search(
                VectorCollection::HeritageGuides,
                query_vector,
                filter,
                args.page_size,
                offset,
            )
            .await?;

        // Belt and suspenders against imperfect backend filtering.
        let results: Vec<serde_json::Value> = hits
            .into_iter()
            .map(|hit| hit.payload)
            .filter(|payload| {
                payload["place"]
                    .as_str()
                    .is_some_and(|p| p.eq_ignore_ascii_case(&tour.place))
            })
            .collect();

        let next_token = vector_next_token(results.len() as u64, args.page_size, offset)?;
        Ok(QueryPage::of(results, next_token))
    }

    /// Finds the tour whose summary best matches the query, accepting it
    /// only when its place agrees (case-insensitively) with the request.
    async fn resolve_tour_for_place(
        &self,
        place: &str,
        query_vector: Vec<f32>,
    ) -> Result<Option<Tour>, AppError> {
        let filter = SearchFilter {
            doc_type: Some(TOUR_INFO_TYPE.to_string()),
            ..Default::default()
        };
        let hits = self
            .vector_store
            .search(VectorCollection::Tours, query_vector, filter, 1, 0)
            .await?;

        for hit in hits {
            match Tour::from_vector_payload(hit.payload) {
                Ok(tour) if tour.place.eq_ignore_ascii_case(place) => return Ok(Some(tour)),
                Ok(tour) => {
                    info!(
                        hit_place = %tour.place,
                        requested = %place,
                        "Nearest tour is for a different place"
                    );
                }
                Err(e) => warn!(error = %e, "Skipping malformed tour payload"),
            }
        }
        Ok(None)
    }

    /// Cold path: fetch the referenced document, extract its text, chunk it
    /// and index every chunk that is not already present.
    async fn materialize_heritage_guide(&self, tour: &Tour) -> Result<(), AppError> {
        info!(tour_id = %tour.tour_id, key = %tour.heritage_guide, "Materializing heritage guide");

        let bytes = self.object_store.fetch(&tour.heritage_guide).await?;
        let text = self.pdf_extractor.extract_text(&bytes)?;
        let chunks = chunk_text(&text, &self.chunk_config)?;
        let written = self.pipeline.index_heritage_chunks(tour, &chunks).await?;

        info!(
            tour_id = %tour.tour_id,
            chunks = chunks.len(),
            written,
            "Heritage guide materialized"
        );
        Ok(())
    }
}

fn parse_max_price(query: &str) -> Option<i64> {
    MAX_PRICE_QUERY
        .captures(query)
        .and_then(|captures| captures[1].replace(',', "").parse().ok())
}

/// Advertises a next page only when the current page came back full; a short
/// page means the source is exhausted even if it would hand out a cursor.
fn vector_next_token(
    returned: u64,
    page_size: u64,
    offset: u64,
) -> Result<Option<String>, AppError> {
    if returned == page_size && page_size > 0 {
        Ok(Some(
            PaginationCursor::Vector {
                offset: offset + page_size,
            }
            .encode()?,
        ))
    } else {
        Ok(None)
    }
}
