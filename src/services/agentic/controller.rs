//! The tool-routing controller: a small cyclic state machine that alternates
//! between asking the model and executing the tools it requested, until the
//! model produces a plain answer.

use super::agents::ToolAgent;
use super::ToolError;
use crate::errors::AppError;
use crate::llm::AiClient;
use genai::chat::{ChatMessage, ChatRequest, MessageContent, Tool, ToolCall, ToolResponse};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// System prompt for the travel assistant conversation.
pub const SYSTEM_PROMPT: &str = "\
You are a travel assistant that can help users with:
1. Searching for tours and their details
2. Searching heritage guide information about specific places or cultural sites
3. Checking their registered tours
4. Registering for tours

For heritage guide searches:
- Use the get_heritage_guide function when searching for cultural or historical information
- Always include both 'place' and 'search_query' parameters when possible
- If the user only gives a place (e.g. 'Get me tour heritage in Hue'), infer a relevant search_query automatically, such as 'heritage sites', 'tourist information', or 'places to visit'

For tour searches:
- Use the get_tours function to find available tours
- Results will show tour details including dates and prices

For the tours information:
- Convert time to UTC+7 for the times in the tour data (yyyy-mm-dd hh:mm format)

Based on the user's request, use the appropriate function and parameters.";

const FAILED_TURN_MESSAGE: &str =
    "I encountered an issue while handling that. Please try again or rephrase your request.";

const EXHAUSTED_ROUNDS_MESSAGE: &str =
    "I wasn't able to finish looking that up. Please try a more specific request.";

const EMPTY_ANSWER_MESSAGE: &str = "I don't have an answer for that.";

enum TurnState {
    AskModel,
    DispatchTools(Vec<ToolCall>),
    Done,
}

pub struct ControllerAgent {
    ai_client: Arc<dyn AiClient>,
    model_name: String,
    max_tool_rounds: usize,
    sub_agents: Vec<ToolAgent>,
}

impl ControllerAgent {
    pub fn new(
        ai_client: Arc<dyn AiClient>,
        model_name: String,
        max_tool_rounds: usize,
        sub_agents: Vec<ToolAgent>,
    ) -> Self {
        Self {
            ai_client,
            model_name,
            max_tool_rounds,
            sub_agents,
        }
    }

    /// Runs one conversational turn to completion.
    ///
    /// Never fails: the turn runs on a scratch copy of the conversation, and
    /// any error is logged and rendered as a single assistant message on the
    /// original conversation. Partial tool results from a failed turn are
    /// discarded, and backend detail stays in the logs.
    #[instrument(skip_all, fields(messages = conversation.len()))]
    pub async fn invoke(&self, conversation: Vec<ChatMessage>) -> Vec<ChatMessage> {
        match self.run_turn(conversation.clone()).await {
            Ok(conversation) => conversation,
            Err(e) => {
                error!(error = %e, "Conversation turn failed");
                let mut conversation = conversation;
                conversation.push(ChatMessage::assistant(FAILED_TURN_MESSAGE));
                conversation
            }
        }
    }

    async fn run_turn(
        &self,
        mut conversation: Vec<ChatMessage>,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let mut state = TurnState::AskModel;
        let mut rounds = 0usize;

        loop {
            state = match state {
                TurnState::AskModel => {
                    if rounds >= self.max_tool_rounds {
                        warn!(rounds, "Tool round limit reached, ending turn");
                        conversation.push(ChatMessage::assistant(EXHAUSTED_ROUNDS_MESSAGE));
                        TurnState::Done
                    } else {
                        rounds += 1;
                        self.ask_model(&mut conversation).await?
                    }
                }

                TurnState::DispatchTools(calls) => {
                    self.dispatch_tools(&mut conversation, calls).await
                }

                TurnState::Done => return Ok(conversation),
            };
        }
    }

    async fn ask_model(
        &self,
        conversation: &mut Vec<ChatMessage>,
    ) -> Result<TurnState, AppError> {
        let mut request = ChatRequest::default().with_tools(self.tool_declarations());
        for message in conversation.iter() {
            request = request.append_message(message.clone());
        }

        let response = self
            .ai_client
            .exec_chat(&self.model_name, request, None)
            .await?;

        if let Some(MessageContent::ToolCalls(calls)) = &response.content {
            if !calls.is_empty() {
                debug!(count = calls.len(), "Model requested tool calls");
                let calls = calls.clone();
                conversation.push(ChatMessage::assistant(MessageContent::ToolCalls(
                    calls.clone(),
                )));
                return Ok(TurnState::DispatchTools(calls));
            }
        }

        let answer = response
            .content_text_as_str()
            .unwrap_or(EMPTY_ANSWER_MESSAGE)
            .to_string();
        conversation.push(ChatMessage::assistant(answer));
        Ok(TurnState::Done)
    }

    async fn dispatch_tools(
        &self,
        conversation: &mut Vec<ChatMessage>,
        calls: Vec<ToolCall>,
    ) -> TurnState {
        let mut responses = Vec::with_capacity(calls.len());

        for call in calls {
            let Some(agent) = self.owning_agent(&call.fn_name) else {
                // Unknown capability ends the turn with an explicit message
                // rather than an error.
                info!(tool = %call.fn_name, "Requested tool is not a known capability");
                conversation.push(ChatMessage::assistant(format!(
                    "It looks like the tool '{}' isn't available in my current set of capabilities.",
                    call.fn_name
                )));
                return TurnState::Done;
            };

            let result = self.execute_call(agent, &call).await;
            let rendered =
                serde_json::to_string(&result).unwrap_or_else(|_| result.to_string());
            responses.push(ToolResponse::new(call.call_id.clone(), rendered));
        }

        for response in responses {
            conversation.push(ChatMessage::from(response));
        }
        TurnState::AskModel
    }

    async fn execute_call(&self, agent: &ToolAgent, call: &ToolCall) -> Value {
        let params = match normalize_arguments(&call.fn_arguments) {
            Ok(params) => params,
            Err(message) => {
                warn!(tool = %call.fn_name, %message, "Tool arguments were malformed");
                return json!({ "error": format!("invalid arguments: {}", message) });
            }
        };

        match agent.execute(&call.fn_name, &params).await {
            Ok(result) => result,
            // The registration workflow's explicit failures keep their
            // specific messages so the model can tell the user what happened.
            Err(ToolError::AppError(AppError::NotFound(msg))) => {
                json!({ "error": msg, "code": "not_found" })
            }
            Err(ToolError::AppError(AppError::Conflict(msg))) => {
                json!({ "error": msg, "code": "conflict" })
            }
            Err(ToolError::AppError(AppError::InvalidInput(msg))) => {
                json!({ "error": msg, "code": "invalid_input" })
            }
            Err(ToolError::InvalidParams(msg)) => {
                json!({ "error": format!("invalid arguments: {}", msg) })
            }
            Err(e) => {
                error!(tool = %call.fn_name, error = %e, "Tool execution failed");
                json!({ "error": "the operation could not be completed" })
            }
        }
    }

    fn owning_agent(&self, tool_name: &str) -> Option<&ToolAgent> {
        self.sub_agents
            .iter()
            .find(|agent| agent.contains_tool(tool_name))
    }

    fn tool_declarations(&self) -> Vec<Tool> {
        self.sub_agents
            .iter()
            .flat_map(|agent| agent.tools())
            .map(|tool| {
                Tool::new(tool.name().to_string())
                    .with_description(tool.description().to_string())
                    .with_schema(tool.input_schema())
            })
            .collect()
    }
}

/// The model may hand tool arguments over as a JSON object or as a
/// JSON-encoded string; accept both.
fn normalize_arguments(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::String(s) => {
            serde_json::from_str(s).map_err(|e| format!("arguments are not valid JSON: {}", e))
        }
        Value::Null => Ok(json!({})),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        controller_harness, text_chat_response, tool_call, tool_call_chat_response,
    };
    use serde_json::json;

    fn user_turn(text: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(text.to_string()),
        ]
    }

    #[test]
    fn test_normalize_arguments_accepts_both_shapes() {
        let object = json!({ "place": "Hue" });
        assert_eq!(normalize_arguments(&object).unwrap(), object);

        let string = Value::String("{\"place\":\"Hue\"}".to_string());
        assert_eq!(normalize_arguments(&string).unwrap(), object);

        assert!(normalize_arguments(&Value::String("not json".to_string())).is_err());
    }

    #[tokio::test]
    async fn test_plain_answer_terminates_immediately() {
        let harness = controller_harness(|h| {
            h.ai_client
                .queue_response(Ok(text_chat_response("Xin chào! How can I help?")));
        });

        let conversation = harness.controller.invoke(user_turn("hello")).await;

        let last = conversation.last().unwrap();
        assert_eq!(
            last.content.text_as_str(),
            Some("Xin chào! How can I help?")
        );
        assert_eq!(harness.ai_client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_round_trips_through_owning_agent() {
        let harness = controller_harness(|h| {
            h.query.tour_store.insert_tour(crate::test_helpers::sample_tour(
                "hoian-001",
                "Hoi An",
            ));
            h.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
                "call-1",
                "get_tours",
                json!({ "place": "Hoi An" }),
            )])));
            h.ai_client
                .queue_response(Ok(text_chat_response("I found 1 tour in Hoi An.")));
        });

        let conversation = harness
            .controller
            .invoke(user_turn("Can you help me find tours in Hoi An?"))
            .await;

        // system, user, assistant(tool calls), tool response, assistant answer
        assert_eq!(conversation.len(), 5);
        assert_eq!(
            conversation.last().unwrap().content.text_as_str(),
            Some("I found 1 tour in Hoi An.")
        );
        assert_eq!(harness.ai_client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_capability_message() {
        let harness = controller_harness(|h| {
            h.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
                "call-1",
                "book_flight",
                json!({}),
            )])));
        });

        let conversation = harness.controller.invoke(user_turn("book me a flight")).await;

        let last = conversation.last().unwrap().content.text_as_str().unwrap();
        assert!(
            last.contains("book_flight") && last.contains("capabilities"),
            "unexpected terminal message: {}",
            last
        );
        // The model is not consulted again after an unknown capability.
        assert_eq!(harness.ai_client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_string_encoded_arguments_are_accepted() {
        let harness = controller_harness(|h| {
            h.query.tour_store.insert_tour(crate::test_helpers::sample_tour(
                "hue-001", "Hue",
            ));
            h.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
                "call-1",
                "get_tours",
                Value::String("{\"place\":\"Hue\"}".to_string()),
            )])));
            h.ai_client.queue_response(Ok(text_chat_response("Done.")));
        });

        let conversation = harness.controller.invoke(user_turn("tours in Hue")).await;
        assert_eq!(
            conversation.last().unwrap().content.text_as_str(),
            Some("Done.")
        );
    }

    #[tokio::test]
    async fn test_model_failure_leaves_single_failure_message() {
        let harness = controller_harness(|h| {
            h.ai_client
                .queue_response(Err(AppError::GeminiError("rate limited".to_string())));
        });

        let input = user_turn("hello");
        let conversation = harness.controller.invoke(input.clone()).await;

        // Original conversation plus exactly one assistant failure message;
        // no partial tool results.
        assert_eq!(conversation.len(), input.len() + 1);
        let last = conversation.last().unwrap().content.text_as_str().unwrap();
        assert_eq!(last, FAILED_TURN_MESSAGE);
        assert!(!last.contains("rate limited"), "backend detail must not leak");
    }

    #[tokio::test]
    async fn test_round_limit_bounds_the_loop() {
        let harness = controller_harness(|h| {
            // The model keeps asking for tools forever.
            for i in 0..20 {
                h.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
                    &format!("call-{}", i),
                    "get_tours",
                    json!({}),
                )])));
            }
        });

        let conversation = harness.controller.invoke(user_turn("loop forever")).await;

        assert_eq!(
            conversation.last().unwrap().content.text_as_str(),
            Some(EXHAUSTED_ROUNDS_MESSAGE)
        );
        assert!(harness.ai_client.call_count() <= 8);
    }
}
