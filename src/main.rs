use anyhow::{Context, Result};
use deadpool_diesel::postgres::{Manager as DeadpoolManager, Runtime as DeadpoolRuntime};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::net::SocketAddr;
use std::sync::Arc;

use tourtalk::config::Config;
use tourtalk::llm::{build_gemini_client, build_gemini_embedding_client, AiClient, EmbeddingClient};
use tourtalk::logging::init_subscriber;
use tourtalk::routes::build_router;
use tourtalk::services::agentic::{tours_register_agent, tours_search_agent, ControllerAgent};
use tourtalk::services::{EmbeddingPipeline, RegistrationService, TourQueryService};
use tourtalk::state::AppState;
use tourtalk::storage::{FileObjectStore, ObjectStore};
use tourtalk::stores::{
    DieselRegistrationStore, DieselTourStore, RegistrationStore, TourStore,
};
use tourtalk::text_processing::{ChunkConfig, LopdfExtractor, PdfExtract};
use tourtalk::vector_db::{QdrantVectorStore, VectorSearchStore};
use tourtalk::PgPool;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_subscriber();

    tracing::info!("Starting tourtalk backend server...");

    let config = Arc::new(Config::load().context("Failed to load configuration")?);

    // --- Database ---
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set")?;
    tracing::info!("Connecting to database...");
    let manager = DeadpoolManager::new(database_url, DeadpoolRuntime::Tokio1);
    let pool: PgPool = PgPool::builder(manager)
        .runtime(DeadpoolRuntime::Tokio1)
        .build()
        .context("Failed to create DB pool")?;
    run_migrations(&pool).await?;

    // --- Vector index ---
    let vector_store: Arc<dyn VectorSearchStore> =
        Arc::new(QdrantVectorStore::new(&config).context("Failed to build Qdrant client")?);
    vector_store
        .ensure_collections()
        .await
        .context("Failed to ensure Qdrant collections")?;

    // --- LLM clients ---
    let ai_client: Arc<dyn AiClient> =
        build_gemini_client().context("Failed to build Gemini chat client")?;
    let embedding_client: Arc<dyn EmbeddingClient> = Arc::new(
        build_gemini_embedding_client(config.clone())
            .context("Failed to build Gemini embedding client")?,
    );

    // --- Object storage ---
    let file_store = FileObjectStore::new(&config.heritage_storage_path);
    file_store
        .init()
        .await
        .context("Failed to initialize object storage")?;
    let object_store: Arc<dyn ObjectStore> = Arc::new(file_store);

    // --- Stores & services ---
    let tour_store: Arc<dyn TourStore> = Arc::new(DieselTourStore::new(pool.clone()));
    let registration_store: Arc<dyn RegistrationStore> =
        Arc::new(DieselRegistrationStore::new(pool.clone()));

    let pipeline = Arc::new(EmbeddingPipeline::new(
        embedding_client.clone(),
        vector_store.clone(),
    ));
    let pdf_extractor: Arc<dyn PdfExtract> = Arc::new(LopdfExtractor::new());
    let query_service = Arc::new(TourQueryService::new(
        tour_store.clone(),
        registration_store.clone(),
        vector_store,
        embedding_client,
        pipeline,
        object_store,
        pdf_extractor,
        ChunkConfig::from(config.as_ref()),
    ));
    let registration_service = Arc::new(RegistrationService::new(
        tour_store,
        registration_store,
    ));

    // --- Controller ---
    let controller = Arc::new(ControllerAgent::new(
        ai_client,
        config.chat_model.clone(),
        config.max_tool_rounds,
        vec![
            tours_search_agent(query_service.clone()),
            tours_register_agent(query_service, registration_service),
        ],
    ));

    // --- HTTP surface ---
    let state = AppState::new(config.clone(), controller);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn run_migrations(pool: &PgPool) -> Result<()> {
    let conn = pool.get().await.context("Failed to get DB connection")?;
    conn.interact(|conn| {
        conn.run_pending_migrations(MIGRATIONS)
            .map(|_| ())
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| anyhow::anyhow!("Migration interact error: {e}"))?
    .map_err(|e| anyhow::anyhow!("Migration error: {e}"))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
