//! Full conversational turns through the controller: scripted model,
//! real sub-agents and services, in-memory stores.

use genai::chat::{ChatMessage, MessageContent};
use serde_json::json;
use tourtalk::services::agentic::controller::SYSTEM_PROMPT;
use tourtalk::test_helpers::{
    controller_harness, sample_tour, text_chat_response, tool_call, tool_call_chat_response,
};

fn new_conversation(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(text.to_string()),
    ]
}

fn last_tool_response_content(conversation: &[ChatMessage]) -> String {
    conversation
        .iter()
        .rev()
        .find_map(|message| match &message.content {
            MessageContent::ToolResponses(responses) => {
                responses.first().map(|response| response.content.clone())
            }
            _ => None,
        })
        .expect("conversation should contain a tool response")
}

#[tokio::test]
async fn test_all_four_tools_are_declared_to_the_model() {
    let harness = controller_harness(|h| {
        h.ai_client.queue_response(Ok(text_chat_response("hi")));
    });

    harness.controller.invoke(new_conversation("hello")).await;

    let mut declared = harness.ai_client.last_declared_tools();
    declared.sort();
    assert_eq!(
        declared,
        vec![
            "get_heritage_guide",
            "get_registered_tours",
            "get_tours",
            "register_tour",
        ]
    );
}

#[tokio::test]
async fn test_search_then_register_then_conflict() {
    let harness = controller_harness(|h| {
        h.query.tour_store.insert_tour(sample_tour("hoian-001", "Hoi An"));
    });

    // Turn 1: the model looks up tours in Hoi An.
    harness.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
        "call-1",
        "get_tours",
        json!({ "place": "Hoi An" }),
    )])));
    harness
        .ai_client
        .queue_response(Ok(text_chat_response("There is one tour in Hoi An.")));

    let mut conversation = harness
        .controller
        .invoke(new_conversation("Can you help me find tours in Hoi An?"))
        .await;
    let tours_payload = last_tool_response_content(&conversation);
    assert!(tours_payload.contains("hoian-001"));

    // Turn 2: the user registers.
    conversation.push(ChatMessage::user(
        "Register me for hoian-001, phone 0258963147".to_string(),
    ));
    harness.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
        "call-2",
        "register_tour",
        json!({ "tourId": "hoian-001", "phoneNumber": "0258963147" }),
    )])));
    harness
        .ai_client
        .queue_response(Ok(text_chat_response("You're registered!")));

    let mut conversation = harness.controller.invoke(conversation).await;
    assert_eq!(harness.query.registration_store.registration_count(), 1);
    let registration_payload = last_tool_response_content(&conversation);
    assert!(registration_payload.contains("0258963147"));
    assert!(registration_payload.contains("startDate"));

    // Turn 3: registering again surfaces the specific conflict.
    conversation.push(ChatMessage::user("Register me again please".to_string()));
    harness.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
        "call-3",
        "register_tour",
        json!({ "tourId": "hoian-001", "phoneNumber": "0258963147" }),
    )])));
    harness
        .ai_client
        .queue_response(Ok(text_chat_response("You are already registered.")));

    let conversation = harness.controller.invoke(conversation).await;
    assert_eq!(harness.query.registration_store.registration_count(), 1);
    let conflict_payload = last_tool_response_content(&conversation);
    assert!(conflict_payload.contains("tour is registered"));
    assert!(conflict_payload.contains("conflict"));
}

#[tokio::test]
async fn test_registered_tours_listing_round_trip() {
    let harness = controller_harness(|h| {
        h.query.tour_store.insert_tour(sample_tour("hue-001", "Hue"));
    });

    // Register out-of-band through the same store the tools use.
    harness.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
        "call-1",
        "register_tour",
        json!({ "tourId": "hue-001", "phoneNumber": "0258963147" }),
    )])));
    harness.ai_client.queue_response(Ok(text_chat_response("Done")));
    harness
        .controller
        .invoke(new_conversation("register me for hue-001"))
        .await;

    // Now list registrations for the phone number.
    harness.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
        "call-2",
        "get_registered_tours",
        json!({ "phoneNumber": "0258963147" }),
    )])));
    harness
        .ai_client
        .queue_response(Ok(text_chat_response("You have one registered tour.")));

    let conversation = harness
        .controller
        .invoke(new_conversation(
            "Give me registered tours for phone number 0258963147",
        ))
        .await;

    let listing = last_tool_response_content(&conversation);
    assert!(listing.contains("hue-001"));
    assert!(
        conversation
            .last()
            .unwrap()
            .content
            .text_as_str()
            .unwrap()
            .contains("one registered tour")
    );
}

#[tokio::test]
async fn test_unknown_tour_registration_reports_not_found() {
    let harness = controller_harness(|h| {
        h.ai_client.queue_response(Ok(tool_call_chat_response(vec![tool_call(
            "call-1",
            "register_tour",
            json!({ "tourId": "nonexistent-id", "phoneNumber": "0900000000" }),
        )])));
        h.ai_client
            .queue_response(Ok(text_chat_response("That tour does not exist.")));
    });

    let conversation = harness
        .controller
        .invoke(new_conversation("register me for nonexistent-id"))
        .await;

    let payload = last_tool_response_content(&conversation);
    assert!(payload.contains("tour not found"));
    assert!(payload.contains("not_found"));
}

#[tokio::test]
async fn test_multiple_tool_calls_in_one_round_all_answered() {
    let harness = controller_harness(|h| {
        h.query.tour_store.insert_tour(sample_tour("hue-001", "Hue"));
        h.query.tour_store.insert_tour(sample_tour("hanoi-001", "Ha Noi"));
        h.ai_client.queue_response(Ok(tool_call_chat_response(vec![
            tool_call("call-1", "get_tours", json!({ "place": "Hue" })),
            tool_call("call-2", "get_tours", json!({ "place": "Ha Noi" })),
        ])));
        h.ai_client
            .queue_response(Ok(text_chat_response("Found tours in both places.")));
    });

    let conversation = harness
        .controller
        .invoke(new_conversation("tours in Hue and Ha Noi?"))
        .await;

    let tool_response_count = conversation
        .iter()
        .filter_map(|message| match &message.content {
            MessageContent::ToolResponses(responses) => Some(responses.len()),
            _ => None,
        })
        .sum::<usize>();
    assert_eq!(tool_response_count, 2, "every requested call gets a result");
}
