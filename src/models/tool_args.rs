//! Argument shapes for the tools declared to the language model.
//!
//! The model produces arguments as JSON (sometimes as a JSON-encoded string);
//! each tool deserializes into one of these structs, so a missing required
//! argument surfaces as a deserialization error rather than a panic deeper in
//! the pipeline. Unknown extra fields are tolerated.

use serde::Deserialize;

const fn default_page_size() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRegisteredToursArgs {
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetToursArgs {
    pub place: Option<String>,
    pub search_query: Option<String>,
    /// Vector payload `type` filter (`tour_info` / `heritage_guide`).
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub pagination_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetHeritageGuideArgs {
    pub place: String,
    pub search_query: Option<String>,
    pub pagination_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterTourArgs {
    #[serde(rename = "tourId")]
    pub tour_id: String,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_tours_args_all_optional() {
        let args: GetToursArgs = serde_json::from_value(json!({})).unwrap();
        assert!(args.place.is_none());
        assert_eq!(args.page_size, 10);
    }

    #[test]
    fn test_register_args_require_both_fields() {
        let result: Result<RegisterTourArgs, _> =
            serde_json::from_value(json!({ "tourId": "hue-001" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_extra_fields_are_tolerated() {
        let args: GetHeritageGuideArgs = serde_json::from_value(json!({
            "place": "Hue",
            "search_query": "heritage sites",
            "model_note": "ignored",
        }))
        .unwrap();
        assert_eq!(args.place, "Hue");
        assert_eq!(args.page_size, 10);
    }
}
