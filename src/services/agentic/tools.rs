//! The concrete tools declared to the language model. Each one is a thin
//! parameter-parsing shell around a service call; all retrieval and write
//! semantics live in the services.

use super::{AgentTool, ToolError, ToolParams, ToolResult};
use crate::models::tool_args::{
    GetHeritageGuideArgs, GetRegisteredToursArgs, GetToursArgs, RegisterTourArgs,
};
use crate::services::registration_service::RegistrationService;
use crate::services::tour_query_service::TourQueryService;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

fn parse_args<T: DeserializeOwned>(params: &ToolParams) -> Result<T, ToolError> {
    serde_json::from_value(params.clone()).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

// --- get_tours ---

pub struct GetToursTool {
    query_service: Arc<TourQueryService>,
}

impl GetToursTool {
    pub fn new(query_service: Arc<TourQueryService>) -> Self {
        Self { query_service }
    }
}

#[async_trait]
impl AgentTool for GetToursTool {
    fn name(&self) -> &'static str {
        "get_tours"
    }

    fn description(&self) -> &'static str {
        "Retrieve existing tours. If a 'place' is provided, it queries tours for that \
         location; with a 'search_query' it searches tours semantically. Returns a page \
         of tours and an optional token for the next page."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "place": {
                    "type": "string",
                    "description": "The name of the place in Vietnam to filter tours by. If omitted, returns all available tours."
                },
                "search_query": {
                    "type": "string",
                    "description": "Natural language query for semantic search. Examples: 'tours in Hoi An', 'tours under 600000 VND', 'tourId abc123-xyz'"
                },
                "type": {
                    "type": "string",
                    "description": "Filter by document type."
                },
                "pagination_token": {
                    "type": "string",
                    "description": "Token for getting the next page of results. Omit for first page."
                },
                "page_size": {
                    "type": "integer",
                    "description": "Number of results to return per page. Default is 10."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let args: GetToursArgs = parse_args(params)?;
        let page = self.query_service.get_tours(args).await;
        Ok(serde_json::to_value(page)?)
    }
}

// --- get_heritage_guide ---

pub struct GetHeritageGuideTool {
    query_service: Arc<TourQueryService>,
}

impl GetHeritageGuideTool {
    pub fn new(query_service: Arc<TourQueryService>) -> Self {
        Self { query_service }
    }
}

#[async_trait]
impl AgentTool for GetHeritageGuideTool {
    fn name(&self) -> &'static str {
        "get_heritage_guide"
    }

    fn description(&self) -> &'static str {
        "Search heritage guide information about a place's cultural or historical \
         sites. The guide document is indexed on first use; subsequent queries reuse \
         the index."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "place": {
                    "type": "string",
                    "description": "The name of the place in Vietnam to get heritage guide information for."
                },
                "search_query": {
                    "type": "string",
                    "description": "Optional natural language query to search within heritage guides. Examples: 'Hue's tourist information', 'Hue's heritage sites', 'Places to visit in Hue'"
                },
                "pagination_token": {
                    "type": "string",
                    "description": "Token for getting the next page of results."
                },
                "page_size": {
                    "type": "integer",
                    "description": "Number of results to return per page. Default is 10."
                }
            },
            "required": ["place"]
        })
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let args: GetHeritageGuideArgs = parse_args(params)?;
        let page = self.query_service.get_heritage_guide(args).await;
        Ok(serde_json::to_value(page)?)
    }
}

// --- get_registered_tours ---

pub struct GetRegisteredToursTool {
    query_service: Arc<TourQueryService>,
}

impl GetRegisteredToursTool {
    pub fn new(query_service: Arc<TourQueryService>) -> Self {
        Self { query_service }
    }
}

#[async_trait]
impl AgentTool for GetRegisteredToursTool {
    fn name(&self) -> &'static str {
        "get_registered_tours"
    }

    fn description(&self) -> &'static str {
        "Retrieve all registered tours for a given phone number."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "phoneNumber": {
                    "type": "string",
                    "description": "The customer's phone number. Used to look up all tours registered under this number."
                }
            },
            "required": ["phoneNumber"]
        })
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let args: GetRegisteredToursArgs = parse_args(params)?;
        let page = self
            .query_service
            .get_registered_tours(&args.phone_number)
            .await;
        Ok(serde_json::to_value(page)?)
    }
}

// --- register_tour ---

pub struct RegisterTourTool {
    registration_service: Arc<RegistrationService>,
}

impl RegisterTourTool {
    pub fn new(registration_service: Arc<RegistrationService>) -> Self {
        Self {
            registration_service,
        }
    }
}

#[async_trait]
impl AgentTool for RegisterTourTool {
    fn name(&self) -> &'static str {
        "register_tour"
    }

    fn description(&self) -> &'static str {
        "Register a phone number for a tour. Fails if the tour does not exist or the \
         phone number is already registered for it."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tourId": {
                    "type": "string",
                    "description": "The tour unique identifier."
                },
                "phoneNumber": {
                    "type": "string",
                    "description": "The customer's phone number used for registration."
                }
            },
            "required": ["tourId", "phoneNumber"]
        })
    }

    async fn execute(&self, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let args: RegisterTourArgs = parse_args(params)?;
        // NotFound / Conflict propagate so the controller can surface the
        // specific failure, unlike the degrading read paths.
        let registration = self
            .registration_service
            .register_tour(&args.tour_id, &args.phone_number)
            .await?;
        Ok(serde_json::to_value(registration)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::test_helpers::{query_service_with, registration_service_with, sample_tour};

    #[tokio::test]
    async fn test_get_tours_tool_parses_loose_arguments() {
        let harness = query_service_with(|h| {
            h.tour_store.insert_tour(sample_tour("hue-001", "Hue"));
        });
        let tool = GetToursTool::new(harness.service_arc());

        let result = tool
            .execute(&json!({ "place": "Hue", "model_extra": true }))
            .await
            .unwrap();
        assert_eq!(result["results"][0]["tourId"], "hue-001");
    }

    #[tokio::test]
    async fn test_register_tool_propagates_not_found() {
        let (registration_service, _stores) = registration_service_with(|_| {});
        let tool = RegisterTourTool::new(registration_service);

        let err = tool
            .execute(&json!({ "tourId": "nope", "phoneNumber": "0900000000" }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::AppError(AppError::NotFound(msg)) if msg == "tour not found"
        ));
    }

    #[tokio::test]
    async fn test_missing_required_argument_is_invalid_params() {
        let (registration_service, _stores) = registration_service_with(|_| {});
        let tool = RegisterTourTool::new(registration_service);

        let err = tool.execute(&json!({ "tourId": "hue-001" })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
