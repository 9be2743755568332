//! Sub-agents: named capability sets of tools.
//!
//! The controller routes a requested tool call to whichever sub-agent's set
//! contains the name (membership, not type hierarchy). The sets are built
//! once at startup from injected services.

use super::{AgentTool, ToolError, ToolParams, ToolResult};
use crate::services::registration_service::RegistrationService;
use crate::services::tour_query_service::TourQueryService;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

pub struct ToolAgent {
    name: &'static str,
    tools: HashMap<&'static str, Arc<dyn AgentTool>>,
}

impl ToolAgent {
    pub fn new(name: &'static str, tools: Vec<Arc<dyn AgentTool>>) -> Self {
        let tools = tools.into_iter().map(|tool| (tool.name(), tool)).collect();
        Self { name, tools }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn contains_tool(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn AgentTool>> {
        self.tools.values()
    }

    #[instrument(skip(self, params), fields(agent = %self.name, tool = %tool_name))]
    pub async fn execute(
        &self,
        tool_name: &str,
        params: &ToolParams,
    ) -> Result<ToolResult, ToolError> {
        let tool = self.tools.get(tool_name).ok_or_else(|| {
            ToolError::ExecutionFailed(format!("Tool '{}' not found", tool_name))
        })?;
        tool.execute(params).await
    }
}

/// Search-side capabilities: catalog retrieval and heritage guides.
pub fn tours_search_agent(query_service: Arc<TourQueryService>) -> ToolAgent {
    ToolAgent::new(
        "tours_search",
        vec![
            Arc::new(super::tools::GetToursTool::new(query_service.clone())),
            Arc::new(super::tools::GetHeritageGuideTool::new(query_service)),
        ],
    )
}

/// Registration-side capabilities: the write path plus "my tours".
pub fn tours_register_agent(
    query_service: Arc<TourQueryService>,
    registration_service: Arc<RegistrationService>,
) -> ToolAgent {
    ToolAgent::new(
        "tours_register",
        vec![
            Arc::new(super::tools::RegisterTourTool::new(registration_service)),
            Arc::new(super::tools::GetRegisteredToursTool::new(query_service)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{query_service_with, registration_service_with};

    #[test]
    fn test_capability_sets_match_declared_tools() {
        let harness = query_service_with(|_| {});
        let (registration_service, _stores) = registration_service_with(|_| {});

        let search = tours_search_agent(harness.service_arc());
        let register = tours_register_agent(harness.service_arc(), registration_service);

        assert!(search.contains_tool("get_tours"));
        assert!(search.contains_tool("get_heritage_guide"));
        assert!(!search.contains_tool("register_tour"));

        assert!(register.contains_tool("register_tour"));
        assert!(register.contains_tool("get_registered_tours"));
        assert!(!register.contains_tool("get_heritage_guide"));
    }

    #[tokio::test]
    async fn test_executing_a_foreign_tool_fails() {
        let harness = query_service_with(|_| {});
        let search = tours_search_agent(harness.service_arc());

        let err = search
            .execute("register_tour", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }
}
