use crate::errors::AppError;
use crate::schema::tours;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

/// Payload discriminator stamped on a tour's vector entry when it is indexed.
pub const TOUR_INFO_TYPE: &str = "tour_info";

/// A bookable catalog entry. Rows are created by an external provisioning
/// process; this service only reads them (and mirrors them into the vector
/// index). Serialized field names follow the catalog wire format
/// (`tourId`, `startDate`, ...), which is also the vector payload format.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = tours)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub tour_id: String,
    pub place: String,
    pub title: String,
    pub start_date: i64,
    pub end_date: i64,
    pub price: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub heritage_guide: String,
}

impl Tour {
    /// The text embedded for semantic tour search.
    pub fn summary_text(&self) -> String {
        format!(
            "Tour in {}: {}. Price: {} VND",
            self.place, self.title, self.price
        )
    }

    /// Serializes the tour into a vector payload, adding the `type`
    /// discriminator used for metadata filtering.
    pub fn to_vector_payload(&self) -> Result<serde_json::Value, AppError> {
        let mut payload = serde_json::to_value(self)?;
        payload
            .as_object_mut()
            .ok_or_else(|| {
                AppError::SerializationError("tour payload is not a JSON object".to_string())
            })?
            .insert(
                "type".to_string(),
                serde_json::Value::String(TOUR_INFO_TYPE.to_string()),
            );
        Ok(payload)
    }

    /// Parses a tour back out of a vector payload. Extra payload fields
    /// (`type`, scores, ...) are ignored.
    pub fn from_vector_payload(payload: serde_json::Value) -> Result<Self, AppError> {
        serde_json::from_value(payload).map_err(|e| {
            AppError::SerializationError(format!("failed to parse tour payload: {}", e))
        })
    }
}
