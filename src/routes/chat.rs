//! The HTTP chat surface: one conversation per session id, one turn at a
//! time. This layer owns conversation state and nothing else; all routing
//! and retrieval logic lives behind the controller.

use crate::errors::AppError;
use crate::services::agentic::controller::SYSTEM_PROMPT;
use crate::state::AppState;
use axum::{extract::State, Json};
use genai::chat::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    /// Omit to start a new conversation.
    pub session_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponseBody {
    pub session_id: Uuid,
    pub reply: String,
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip(state, body))]
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::InvalidInput("message must not be empty".to_string()));
    }

    let session_id = body.session_id.unwrap_or_else(Uuid::new_v4);

    let conversation = {
        let mut sessions = state.sessions.lock().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(vec![ChatMessage::system(SYSTEM_PROMPT)]))
            })
            .clone()
    };

    // Held across the whole turn: a session processes one turn to completion
    // before the next is accepted.
    let mut conversation = conversation.lock().await;
    conversation.push(ChatMessage::user(body.message));
    *conversation = state.controller.invoke(conversation.clone()).await;

    let reply = conversation
        .last()
        .and_then(|message| message.content.text_as_str())
        .unwrap_or_default()
        .to_string();

    Ok(Json(ChatResponseBody { session_id, reply }))
}
