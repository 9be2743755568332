pub mod chat;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(chat::health_handler))
        .route("/api/chat", post(chat::chat_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
