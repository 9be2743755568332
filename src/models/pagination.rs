use crate::errors::AppError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

/// Continuation token for a paged query.
///
/// The structured store and the vector index paginate differently (keyset
/// continuation vs. result offset), so the cursor is a tagged union: a token
/// handed back by one source can never be decoded into the other source's
/// shape and silently misread. Tokens are base64(JSON) so callers treat them
/// as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PaginationCursor {
    /// Resume a structured-store scan/query after this tour id.
    Structured { last_tour_id: String },
    /// Resume a vector search at this result offset.
    Vector { offset: u64 },
}

impl PaginationCursor {
    pub fn encode(&self) -> Result<String, AppError> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(token: &str) -> Result<Self, AppError> {
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|e| {
            AppError::InvalidInput(format!("malformed pagination token: {}", e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::InvalidInput(format!("malformed pagination token: {}", e))
        })
    }

    /// Unwraps a structured-store cursor, rejecting tokens minted by the
    /// vector index.
    pub fn into_structured(self) -> Result<String, AppError> {
        match self {
            Self::Structured { last_tour_id } => Ok(last_tour_id),
            Self::Vector { .. } => Err(AppError::InvalidInput(
                "pagination token does not belong to this query source".to_string(),
            )),
        }
    }

    /// Unwraps a vector-index cursor, rejecting tokens minted by the
    /// structured store.
    pub fn into_vector(self) -> Result<u64, AppError> {
        match self {
            Self::Vector { offset } => Ok(offset),
            Self::Structured { .. } => Err(AppError::InvalidInput(
                "pagination token does not belong to this query source".to_string(),
            )),
        }
    }
}
