pub mod agentic;
pub mod embedding_pipeline;
pub mod registration_service;
pub mod tour_query_service;

pub use embedding_pipeline::EmbeddingPipeline;
pub use registration_service::RegistrationService;
pub use tour_query_service::TourQueryService;
