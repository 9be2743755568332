use async_trait::async_trait;
use genai::{
    chat::{ChatOptions, ChatRequest, ChatResponse},
    Client, ClientBuilder,
};
use std::sync::Arc;

use super::AiClient;
use crate::errors::AppError;

/// Wrapper struct around the genai::Client to implement our AiClient trait.
pub struct TourtalkGeminiClient {
    inner: Client,
}

#[async_trait]
impl AiClient for TourtalkGeminiClient {
    async fn exec_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        config_override: Option<ChatOptions>,
    ) -> Result<ChatResponse, AppError> {
        self.inner
            .exec_chat(model_name, request, config_override.as_ref())
            .await
            .map_err(AppError::from)
    }
}

#[async_trait]
impl AiClient for Arc<TourtalkGeminiClient> {
    async fn exec_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        config_override: Option<ChatOptions>,
    ) -> Result<ChatResponse, AppError> {
        (**self).exec_chat(model_name, request, config_override).await
    }
}

/// Builds the TourtalkGeminiClient wrapper. The genai client picks up
/// GEMINI_API_KEY from the environment.
pub fn build_gemini_client() -> Result<Arc<TourtalkGeminiClient>, AppError> {
    let client = ClientBuilder::default().build();
    Ok(Arc::new(TourtalkGeminiClient { inner: client }))
}
