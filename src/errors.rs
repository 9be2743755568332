// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

// Kept Clone so mocks can store canned Result values; every variant carries
// an owned String rather than the source error type for the same reason.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    // --- Request/Input Errors ---
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    // --- Database Errors ---
    #[error("Database query error: {0}")]
    DatabaseQueryError(String),

    #[error("Database pool error: {0}")]
    DbPoolError(String),

    #[error("Database interaction error: {0}")]
    DbInteractError(String),

    #[error("Database migration error: {0}")]
    DbMigrationError(String),

    // --- External Service Errors ---
    #[error("LLM API error: {0}")]
    GeminiError(String),

    #[error("LLM Embedding Error: {0}")]
    EmbeddingError(String),

    #[error("Vector DB Error: {0}")]
    VectorDbError(String),

    #[error("HTTP Request Error: {0}")]
    HttpRequestError(String),

    #[error("Object storage error: {0}")]
    ObjectStorageError(String),

    // --- Document Processing Errors ---
    #[error("PDF extraction error: {0}")]
    PdfExtractionError(String),

    #[error("Text chunking error: {0}")]
    ChunkingError(String),

    // --- General/Internal Errors ---
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Serialization Error: {0}")]
    SerializationError(String),

    #[error("IO Error: {0}")]
    IoError(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl From<genai::Error> for AppError {
    fn from(err: genai::Error) -> Self {
        AppError::GeminiError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

// --- IntoResponse Implementation ---
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // 4xx Client Errors
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, format!("Invalid input: {}", msg))
            }

            // 5xx Server Errors: log the detail, return a generic message so
            // backend error strings never leak to the end user.
            ref err @ (AppError::DatabaseQueryError(_)
            | AppError::DbPoolError(_)
            | AppError::DbInteractError(_)
            | AppError::DbMigrationError(_)
            | AppError::SerializationError(_)
            | AppError::IoError(_)
            | AppError::ConfigError(_)
            | AppError::InternalServerError(_)
            | AppError::PdfExtractionError(_)
            | AppError::ChunkingError(_)
            | AppError::ObjectStorageError(_)) => {
                error!(error = %err, "Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }

            ref err @ (AppError::GeminiError(_)
            | AppError::EmbeddingError(_)
            | AppError::VectorDbError(_)
            | AppError::HttpRequestError(_)) => {
                error!(error = %err, "Upstream service error while handling request");
                (
                    StatusCode::BAD_GATEWAY,
                    "An upstream service is unavailable".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("tour not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let response = AppError::Conflict("tour is registered".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_backend_detail_is_not_leaked() {
        let response =
            AppError::DatabaseQueryError("connection refused at 10.0.0.3".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
