//! Mock implementations of every external collaborator, shared by unit and
//! integration tests. Each mock records its calls and serves scripted
//! responses, so tests can assert what was (and was not) invoked.

use crate::errors::AppError;
use crate::llm::{AiClient, EmbeddingClient};
use crate::models::{Registration, Tour};
use crate::services::agentic::{tours_register_agent, tours_search_agent, ControllerAgent};
use crate::services::{EmbeddingPipeline, RegistrationService, TourQueryService};
use crate::storage::ObjectStore;
use crate::stores::{RegistrationStore, TourPage, TourStore};
use crate::text_processing::{ChunkConfig, ChunkingMetric, PdfExtract};
use crate::vector_db::{SearchFilter, VectorCollection, VectorHit, VectorRecord, VectorSearchStore};

use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{
    ChatOptions, ChatRequest, ChatResponse, MessageContent, ToolCall, Usage,
};
use genai::ModelIden;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// --- Fixtures ---

pub fn sample_tour(tour_id: &str, place: &str) -> Tour {
    Tour {
        tour_id: tour_id.to_string(),
        place: place.to_string(),
        title: format!("{} discovery tour", place),
        start_date: 1_750_000_000,
        end_date: 1_750_086_400,
        price: 550_000,
        status: "open".to_string(),
        category: "heritage".to_string(),
        heritage_guide: String::new(),
    }
}

// --- MockTourStore ---

pub struct MockTourStore {
    tours: Mutex<BTreeMap<String, Tour>>,
    failure: Mutex<Option<AppError>>,
    calls: AtomicUsize,
}

impl MockTourStore {
    pub fn new() -> Self {
        Self {
            tours: Mutex::new(BTreeMap::new()),
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn insert_tour(&self, tour: Tour) {
        self.tours
            .lock()
            .unwrap()
            .insert(tour.tour_id.clone(), tour);
    }

    /// Makes every subsequent call fail with the given error.
    pub fn set_failure(&self, error: AppError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.failure.lock().unwrap() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn page(
        &self,
        place: Option<&str>,
        limit: u64,
        exclusive_start: Option<String>,
    ) -> TourPage {
        let tours = self.tours.lock().unwrap();
        let mut matched: Vec<Tour> = tours
            .values()
            .filter(|tour| place.map_or(true, |p| tour.place == p))
            .filter(|tour| {
                exclusive_start
                    .as_deref()
                    .map_or(true, |start| tour.tour_id.as_str() > start)
            })
            .cloned()
            .collect();

        let has_more = matched.len() as u64 > limit;
        matched.truncate(limit as usize);
        let last_evaluated_id = if has_more {
            matched.last().map(|tour| tour.tour_id.clone())
        } else {
            None
        };
        TourPage {
            tours: matched,
            last_evaluated_id,
        }
    }
}

impl Default for MockTourStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TourStore for MockTourStore {
    async fn query_by_place(
        &self,
        place: &str,
        limit: u64,
        exclusive_start: Option<String>,
    ) -> Result<TourPage, AppError> {
        self.check_failure()?;
        Ok(self.page(Some(place), limit, exclusive_start))
    }

    async fn scan(
        &self,
        limit: u64,
        exclusive_start: Option<String>,
    ) -> Result<TourPage, AppError> {
        self.check_failure()?;
        Ok(self.page(None, limit, exclusive_start))
    }

    async fn find_by_id(&self, tour_id: &str) -> Result<Option<Tour>, AppError> {
        self.check_failure()?;
        Ok(self.tours.lock().unwrap().get(tour_id).cloned())
    }
}

// --- MockRegistrationStore ---

pub struct MockRegistrationStore {
    registrations: Mutex<HashMap<(String, String), Registration>>,
    reject_next_insert: AtomicUsize,
}

impl MockRegistrationStore {
    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
            reject_next_insert: AtomicUsize::new(0),
        }
    }

    /// Makes the next conditional insert report "already present", as if a
    /// concurrent writer had won the race.
    pub fn fail_conditional_insert_once(&self) {
        self.reject_next_insert.store(1, Ordering::SeqCst);
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }
}

impl Default for MockRegistrationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistrationStore for MockRegistrationStore {
    async fn list_by_phone(&self, phone_number: &str) -> Result<Vec<Registration>, AppError> {
        let mut registrations: Vec<Registration> = self
            .registrations
            .lock()
            .unwrap()
            .values()
            .filter(|registration| registration.phone_number == phone_number)
            .cloned()
            .collect();
        registrations.sort_by_key(|registration| registration.create_at);
        Ok(registrations)
    }

    async fn find(
        &self,
        tour_id: &str,
        phone_number: &str,
    ) -> Result<Option<Registration>, AppError> {
        Ok(self
            .registrations
            .lock()
            .unwrap()
            .get(&(tour_id.to_string(), phone_number.to_string()))
            .cloned())
    }

    async fn insert_if_absent(&self, registration: Registration) -> Result<bool, AppError> {
        if self
            .reject_next_insert
            .compare_exchange(1, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return Ok(false);
        }

        let key = (
            registration.tour_id.clone(),
            registration.phone_number.clone(),
        );
        let mut registrations = self.registrations.lock().unwrap();
        if registrations.contains_key(&key) {
            return Ok(false);
        }
        registrations.insert(key, registration);
        Ok(true)
    }
}

// --- MockVectorStore ---

/// Arguments captured for one search call.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub collection: VectorCollection,
    pub filter: SearchFilter,
    pub limit: u64,
    pub offset: u64,
}

/// In-memory vector index double. Point storage (upsert/fetch) is real so
/// existence probes behave; similarity search is scripted per call via
/// [`queue_search`](Self::queue_search) since the mock has no geometry.
pub struct MockVectorStore {
    points: Mutex<HashMap<(VectorCollection, String), Value>>,
    upserts: Mutex<Vec<(VectorCollection, Vec<String>)>>,
    search_responses: Mutex<VecDeque<Result<Vec<VectorHit>, AppError>>>,
    search_calls: Mutex<Vec<RecordedSearch>>,
    fetch_calls: AtomicUsize,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self {
            points: Mutex::new(HashMap::new()),
            upserts: Mutex::new(Vec::new()),
            search_responses: Mutex::new(VecDeque::new()),
            search_calls: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Pre-seeds a point, as if it had been indexed earlier.
    pub fn seed_point(&self, collection: VectorCollection, id: &str, payload: Value) {
        self.points
            .lock()
            .unwrap()
            .insert((collection, id.to_string()), payload);
    }

    pub fn queue_search(&self, response: Result<Vec<VectorHit>, AppError>) {
        self.search_responses.lock().unwrap().push_back(response);
    }

    /// Logical ids written through `upsert`, in write order.
    pub fn upserted_ids(&self, collection: VectorCollection) -> Vec<String> {
        self.upserts
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == collection)
            .flat_map(|(_, ids)| ids.clone())
            .collect()
    }

    pub fn search_calls(&self) -> Vec<RecordedSearch> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, collection: VectorCollection, id: &str) -> bool {
        self.points
            .lock()
            .unwrap()
            .contains_key(&(collection, id.to_string()))
    }
}

impl Default for MockVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorSearchStore for MockVectorStore {
    async fn ensure_collections(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn upsert(
        &self,
        collection: VectorCollection,
        records: Vec<VectorRecord>,
    ) -> Result<(), AppError> {
        let ids: Vec<String> = records.iter().map(|record| record.id.clone()).collect();
        self.upserts.lock().unwrap().push((collection, ids));
        let mut points = self.points.lock().unwrap();
        for record in records {
            points.insert((collection, record.id), record.payload);
        }
        Ok(())
    }

    async fn fetch(
        &self,
        collection: VectorCollection,
        ids: &[String],
    ) -> Result<Vec<(String, Value)>, AppError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let points = self.points.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                points
                    .get(&(collection, id.clone()))
                    .map(|payload| (id.clone(), payload.clone()))
            })
            .collect())
    }

    async fn search(
        &self,
        collection: VectorCollection,
        _query_vector: Vec<f32>,
        filter: SearchFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<VectorHit>, AppError> {
        self.search_calls.lock().unwrap().push(RecordedSearch {
            collection,
            filter,
            limit,
            offset,
        });
        match self.search_responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(Vec::new()),
        }
    }
}

// --- MockEmbeddingClient ---

#[derive(Clone)]
pub struct MockEmbeddingClient {
    response: Arc<Mutex<Option<Result<Vec<f32>, AppError>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockEmbeddingClient {
    pub fn new() -> Self {
        MockEmbeddingClient {
            response: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_response(&self, response: Result<Vec<f32>, AppError>) {
        let mut lock = self.response.lock().unwrap();
        *lock = Some(response);
    }

    /// (text, task_type) pairs, in call order.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    async fn embed_content(&self, text: &str, task_type: &str) -> Result<Vec<f32>, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), task_type.to_string()));
        match self.response.lock().unwrap().clone() {
            Some(response) => response,
            None => Ok(vec![0.1; 8]),
        }
    }
}

// --- MockObjectStore ---

pub struct MockObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fetch_calls: AtomicUsize,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, key: &str, bytes: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, AppError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("object not found: {}", key)))
    }
}

// --- CountingPdfExtractor ---

/// Stands in for PDF extraction: returns fixed text and counts invocations,
/// which is how the cold-to-warm heritage tests observe that extraction runs
/// at most once per document.
pub struct CountingPdfExtractor {
    text: Mutex<String>,
    calls: AtomicUsize,
}

impl CountingPdfExtractor {
    pub fn new(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PdfExtract for CountingPdfExtractor {
    fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.lock().unwrap().clone())
    }
}

// --- MockAiClient ---

pub struct MockAiClient {
    responses: Mutex<VecDeque<Result<ChatResponse, AppError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockAiClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Scripts the next model turn; queue several for multi-round tests.
    pub fn queue_response(&self, response: Result<ChatResponse, AppError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The tool declarations sent with the most recent request.
    pub fn last_declared_tools(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|request| request.tools.clone())
            .map(|tools| tools.into_iter().map(|tool| tool.name).collect())
            .unwrap_or_default()
    }
}

impl Default for MockAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiClient for MockAiClient {
    async fn exec_chat(
        &self,
        _model_name: &str,
        request: ChatRequest,
        _config_override: Option<ChatOptions>,
    ) -> Result<ChatResponse, AppError> {
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(text_chat_response("Default mock response")),
        }
    }
}

// --- genai response builders ---

pub fn text_chat_response(text: &str) -> ChatResponse {
    ChatResponse {
        content: Some(MessageContent::from_text(text)),
        reasoning_content: None,
        model_iden: ModelIden::new(AdapterKind::Gemini, "mock-model"),
        provider_model_iden: ModelIden::new(AdapterKind::Gemini, "mock-model"),
        usage: Usage::default(),
    }
}

pub fn tool_call(call_id: &str, fn_name: &str, fn_arguments: Value) -> ToolCall {
    ToolCall {
        call_id: call_id.to_string(),
        fn_name: fn_name.to_string(),
        fn_arguments,
    }
}

pub fn tool_call_chat_response(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        content: Some(MessageContent::ToolCalls(calls)),
        reasoning_content: None,
        model_iden: ModelIden::new(AdapterKind::Gemini, "mock-model"),
        provider_model_iden: ModelIden::new(AdapterKind::Gemini, "mock-model"),
        usage: Usage::default(),
    }
}

// --- Wiring helpers ---

fn test_chunk_config() -> ChunkConfig {
    ChunkConfig {
        metric: ChunkingMetric::Char,
        max_size: 120,
        overlap: 20,
    }
}

/// Every mock collaborator plus a fully wired `TourQueryService`.
pub struct QueryServiceHarness {
    pub tour_store: Arc<MockTourStore>,
    pub registration_store: Arc<MockRegistrationStore>,
    pub vector_store: Arc<MockVectorStore>,
    pub embedding: Arc<MockEmbeddingClient>,
    pub object_store: Arc<MockObjectStore>,
    pub pdf: Arc<CountingPdfExtractor>,
    pub service: Arc<TourQueryService>,
}

impl QueryServiceHarness {
    pub fn service_arc(&self) -> Arc<TourQueryService> {
        self.service.clone()
    }
}

pub fn query_service_with(setup: impl FnOnce(&QueryServiceHarness)) -> QueryServiceHarness {
    let tour_store = Arc::new(MockTourStore::new());
    let registration_store = Arc::new(MockRegistrationStore::new());
    let vector_store = Arc::new(MockVectorStore::new());
    let embedding = Arc::new(MockEmbeddingClient::new());
    let object_store = Arc::new(MockObjectStore::new());
    let pdf = Arc::new(CountingPdfExtractor::new(
        "The Imperial City of Hue is a walled enclosure within the citadel. \
         Hoan Kiem Lake is a showcase of summer cuisine in Hanoi. \
         The Japanese Covered Bridge is an emblem of Hoi An.",
    ));

    let pipeline = Arc::new(EmbeddingPipeline::new(
        embedding.clone(),
        vector_store.clone(),
    ));
    let service = Arc::new(TourQueryService::new(
        tour_store.clone(),
        registration_store.clone(),
        vector_store.clone(),
        embedding.clone(),
        pipeline,
        object_store.clone(),
        pdf.clone(),
        test_chunk_config(),
    ));

    let harness = QueryServiceHarness {
        tour_store,
        registration_store,
        vector_store,
        embedding,
        object_store,
        pdf,
        service,
    };
    setup(&harness);
    harness
}

pub struct RegistrationHarness {
    pub tour_store: Arc<MockTourStore>,
    pub registration_store: Arc<MockRegistrationStore>,
}

pub fn registration_service_with(
    setup: impl FnOnce(&RegistrationHarness),
) -> (Arc<RegistrationService>, RegistrationHarness) {
    let harness = RegistrationHarness {
        tour_store: Arc::new(MockTourStore::new()),
        registration_store: Arc::new(MockRegistrationStore::new()),
    };
    setup(&harness);
    let service = Arc::new(RegistrationService::new(
        harness.tour_store.clone(),
        harness.registration_store.clone(),
    ));
    (service, harness)
}

/// A controller wired to mocks end-to-end: scripted model, real sub-agents,
/// real services, mock stores.
pub struct ControllerHarness {
    pub ai_client: Arc<MockAiClient>,
    pub query: QueryServiceHarness,
    pub controller: Arc<ControllerAgent>,
}

pub fn controller_harness(setup: impl FnOnce(&ControllerHarness)) -> ControllerHarness {
    let query = query_service_with(|_| {});
    let registration_service = Arc::new(RegistrationService::new(
        query.tour_store.clone(),
        query.registration_store.clone(),
    ));

    let ai_client = Arc::new(MockAiClient::new());
    let controller = Arc::new(ControllerAgent::new(
        ai_client.clone(),
        "gemini-test".to_string(),
        8,
        vec![
            tours_search_agent(query.service_arc()),
            tours_register_agent(query.service_arc(), registration_service),
        ],
    ));

    let harness = ControllerHarness {
        ai_client,
        query,
        controller,
    };
    setup(&harness);
    harness
}
