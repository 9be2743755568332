//! End-to-end tests for the heritage-guide retrieval pipeline: tour
//! resolution, the cold-path materialization (fetch → extract → chunk →
//! embed) and the warm path that reuses the index.

use serde_json::Value;
use tourtalk::models::tool_args::GetHeritageGuideArgs;
use tourtalk::models::{PaginationCursor, Tour};
use tourtalk::services::embedding_pipeline::{
    heritage_chunk_id, HeritageChunkMetadata, HERITAGE_GUIDE_TYPE,
};
use tourtalk::test_helpers::{query_service_with, sample_tour, QueryServiceHarness};
use tourtalk::vector_db::{VectorCollection, VectorHit};

fn guide_tour() -> Tour {
    let mut tour = sample_tour("hue-001", "Hue");
    tour.heritage_guide = "guides/hue.pdf".to_string();
    tour
}

fn tour_hit(tour: &Tour) -> VectorHit {
    VectorHit {
        score: 0.95,
        payload: tour.to_vector_payload().unwrap(),
    }
}

fn chunk_hit(place: &str, tour_id: &str, chunk_index: usize, text: &str) -> VectorHit {
    let metadata = HeritageChunkMetadata {
        place: place.to_string(),
        tour_id: tour_id.to_string(),
        heritage_guide: "guides/hue.pdf".to_string(),
        chunk_index,
        doc_type: HERITAGE_GUIDE_TYPE.to_string(),
        raw_text: text.to_string(),
    };
    VectorHit {
        score: 0.9,
        payload: serde_json::to_value(metadata).unwrap(),
    }
}

fn args(place: &str) -> GetHeritageGuideArgs {
    GetHeritageGuideArgs {
        place: place.to_string(),
        search_query: Some("heritage sites".to_string()),
        pagination_token: None,
        page_size: 10,
    }
}

fn seed_cold_harness(harness: &QueryServiceHarness) {
    harness
        .object_store
        .put("guides/hue.pdf", b"%PDF-stand-in".to_vec());
    // First search resolves the tour, second one queries heritage chunks.
    harness.vector_store.queue_search(Ok(vec![tour_hit(&guide_tour())]));
    harness.vector_store.queue_search(Ok(vec![
        chunk_hit("Hue", "hue-001", 0, "The Imperial City of Hue"),
        chunk_hit("Hue", "hue-001", 1, "walled enclosure within the citadel"),
    ]));
}

#[tokio::test]
async fn test_cold_call_materializes_guide_and_returns_results() {
    let harness = query_service_with(seed_cold_harness);

    let page = harness.service.get_heritage_guide(args("Hue")).await;

    assert!(page.error.is_none(), "unexpected error: {:?}", page.error);
    assert_eq!(page.results.len(), 2);
    assert_eq!(harness.object_store.fetch_call_count(), 1);
    assert_eq!(harness.pdf.call_count(), 1);

    // The chunks were actually written under their logical ids.
    assert!(harness
        .vector_store
        .contains(VectorCollection::HeritageGuides, &heritage_chunk_id("hue-001", 0)));
}

#[tokio::test]
async fn test_second_call_skips_extraction() {
    let harness = query_service_with(seed_cold_harness);
    harness.service.get_heritage_guide(args("Hue")).await;
    assert_eq!(harness.pdf.call_count(), 1);

    // Same place, same query: the existence probe finds chunk 0 and the
    // cold path never runs again.
    harness.vector_store.queue_search(Ok(vec![tour_hit(&guide_tour())]));
    harness
        .vector_store
        .queue_search(Ok(vec![chunk_hit("Hue", "hue-001", 0, "The Imperial City of Hue")]));

    let page = harness.service.get_heritage_guide(args("Hue")).await;

    assert!(!page.results.is_empty());
    assert_eq!(harness.pdf.call_count(), 1, "extraction must not run twice");
    assert_eq!(harness.object_store.fetch_call_count(), 1);
}

#[tokio::test]
async fn test_place_without_matching_tour_is_empty_not_error() {
    let harness = query_service_with(|h| {
        // Nearest tour is for a different place entirely.
        h.vector_store
            .queue_search(Ok(vec![tour_hit(&sample_tour("hanoi-001", "Ha Noi"))]));
    });

    let page = harness.service.get_heritage_guide(args("Hue")).await;

    assert!(page.results.is_empty());
    assert!(page.error.is_none(), "no heritage data is a normal outcome");
    assert_eq!(harness.pdf.call_count(), 0);
}

#[tokio::test]
async fn test_place_match_is_case_insensitive() {
    let harness = query_service_with(seed_cold_harness);

    let page = harness.service.get_heritage_guide(args("hue")).await;

    assert!(page.error.is_none());
    assert_eq!(page.results.len(), 2);
}

#[tokio::test]
async fn test_tour_without_guide_reference_is_empty() {
    let harness = query_service_with(|h| {
        // Tour resolves but carries no heritage_guide key.
        h.vector_store
            .queue_search(Ok(vec![tour_hit(&sample_tour("hue-002", "Hue"))]));
    });

    let page = harness.service.get_heritage_guide(args("Hue")).await;

    assert!(page.results.is_empty());
    assert!(page.error.is_none());
    assert_eq!(harness.object_store.fetch_call_count(), 0);
}

#[tokio::test]
async fn test_missing_document_degrades_to_empty_results() {
    let harness = query_service_with(|h| {
        // No object behind the key: the cold path fails and is swallowed.
        h.vector_store.queue_search(Ok(vec![tour_hit(&guide_tour())]));
        h.vector_store.queue_search(Ok(vec![]));
    });

    let page = harness.service.get_heritage_guide(args("Hue")).await;

    assert!(page.results.is_empty());
    assert!(page.error.is_none(), "cold-path failure must be absorbed");
    assert_eq!(harness.object_store.fetch_call_count(), 1);
}

#[tokio::test]
async fn test_results_from_other_places_are_filtered_out() {
    let harness = query_service_with(|h| {
        h.object_store.put("guides/hue.pdf", b"%PDF".to_vec());
        h.vector_store.queue_search(Ok(vec![tour_hit(&guide_tour())]));
        // Backend filtering let a Ha Noi chunk through.
        h.vector_store.queue_search(Ok(vec![
            chunk_hit("Hue", "hue-001", 0, "Imperial City"),
            chunk_hit("Ha Noi", "hanoi-001", 0, "Hoan Kiem Lake"),
        ]));
    });

    let page = harness.service.get_heritage_guide(args("Hue")).await;

    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0]["place"], "Hue");
}

#[tokio::test]
async fn test_short_page_suppresses_next_token() {
    let harness = query_service_with(|h| {
        h.object_store.put("guides/hue.pdf", b"%PDF".to_vec());
        h.vector_store.queue_search(Ok(vec![tour_hit(&guide_tour())]));
        h.vector_store
            .queue_search(Ok(vec![chunk_hit("Hue", "hue-001", 0, "only one chunk")]));
    });

    let page = harness.service.get_heritage_guide(args("Hue")).await;

    assert_eq!(page.results.len(), 1);
    assert!(
        page.next_token.is_none(),
        "a short page means the source is exhausted"
    );
}

#[tokio::test]
async fn test_full_page_advertises_vector_cursor() {
    let hits: Vec<VectorHit> = (0..3)
        .map(|i| chunk_hit("Hue", "hue-001", i, "chunk"))
        .collect();
    let harness = query_service_with(move |h| {
        h.object_store.put("guides/hue.pdf", b"%PDF".to_vec());
        h.vector_store.queue_search(Ok(vec![tour_hit(&guide_tour())]));
        h.vector_store.queue_search(Ok(hits));
    });

    let mut small_page = args("Hue");
    small_page.page_size = 3;
    let page = harness.service.get_heritage_guide(small_page).await;

    assert_eq!(page.results.len(), 3);
    let token = page.next_token.expect("full page should advertise more");
    assert_eq!(
        PaginationCursor::decode(&token).unwrap(),
        PaginationCursor::Vector { offset: 3 }
    );
}

#[tokio::test]
async fn test_synthesized_query_when_none_given() {
    let harness = query_service_with(|h| {
        h.vector_store.queue_search(Ok(vec![]));
    });

    let mut no_query = args("Hue");
    no_query.search_query = None;
    harness.service.get_heritage_guide(no_query).await;

    let calls = harness.embedding.get_calls();
    assert_eq!(calls.len(), 1);
    let (text, task) = &calls[0];
    assert!(
        text.contains("Hue"),
        "synthesized query should mention the place: {}",
        text
    );
    assert_eq!(task, "RETRIEVAL_QUERY");
}

#[tokio::test]
async fn test_structured_cursor_is_rejected_with_degraded_page() {
    let harness = query_service_with(|_| {});
    let token = PaginationCursor::Structured {
        last_tour_id: "hue-000".to_string(),
    }
    .encode()
    .unwrap();

    let mut bad_cursor = args("Hue");
    bad_cursor.pagination_token = Some(token);
    let page = harness.service.get_heritage_guide(bad_cursor).await;

    assert!(page.results.is_empty());
    let error = page.error.expect("cross-source cursor must be reported");
    assert!(error.contains("pagination token"), "got: {}", error);
}

#[tokio::test]
async fn test_chunk_payloads_round_trip_through_json() {
    let hit = chunk_hit("Hue", "hue-001", 2, "raw chunk text");
    let parsed: HeritageChunkMetadata = serde_json::from_value(hit.payload.clone()).unwrap();
    assert_eq!(parsed.chunk_index, 2);
    assert_eq!(parsed.raw_text, "raw chunk text");
    assert_eq!(hit.payload["type"], Value::String(HERITAGE_GUIDE_TYPE.into()));
}
