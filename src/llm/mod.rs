use crate::errors::AppError;
use async_trait::async_trait;
use genai::chat::{ChatOptions, ChatRequest, ChatResponse};

pub mod gemini_client;
pub mod gemini_embedding_client;

pub use gemini_client::{build_gemini_client, TourtalkGeminiClient};
pub use gemini_embedding_client::{build_gemini_embedding_client, RestGeminiEmbeddingClient};

/// Trait defining the interface for AI chat operations.
///
/// The controller talks to the model only through this trait, so tests can
/// script model turns (including tool-call requests) without the network.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Executes a chat request with the AI model.
    ///
    /// # Arguments
    ///
    /// * `model_name` - The identifier for the specific AI model to use.
    /// * `request` - The chat request containing messages, tools, and configuration.
    /// * `config_override` - Optional generation configuration overrides.
    async fn exec_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        config_override: Option<ChatOptions>,
    ) -> Result<ChatResponse, AppError>;
}

/// Trait for producing embedding vectors.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embeds `text` for the given task type (`RETRIEVAL_DOCUMENT` when
    /// indexing, `RETRIEVAL_QUERY` when searching).
    async fn embed_content(&self, text: &str, task_type: &str) -> Result<Vec<f32>, AppError>;
}
