//! Property-based tests for the gateway translation layers
//!
//! Invariants checked across both wire protocols:
//! - Tool calls keep their order and ids through normalization
//! - Every tool result reaches the wire exactly once, tagged with its call id
//! - Message translation never produces empty output
//! - The system prompt appears exactly once

#![allow(clippy::redundant_closure_for_method_calls)]

use super::anthropic::{AnthropicContentBlock, AnthropicResponse, AnthropicService, AnthropicUsage};
use super::openai::{
    OpenAIChoice, OpenAIFunctionCall, OpenAIMessage, OpenAIResponse, OpenAIService,
    OpenAIToolCall, OpenAIUsage,
};
use super::types::{ContentBlock, LlmMessage, LlmRequest, MessageRole};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_text_block() -> impl Strategy<Value = ContentBlock> {
    "[a-zA-Z0-9 _.!?,]{1,100}".prop_map(|text| ContentBlock::Text { text })
}

fn arb_json_value() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        (-1000i64..1000).prop_map(|n| serde_json::Value::Number(n.into())),
        "[a-zA-Z0-9 ]{0,50}".prop_map(serde_json::Value::String),
        proptest::collection::hash_map("[a-z_]{1,10}", "[a-zA-Z0-9 ]{0,30}", 0..5).prop_map(|m| {
            serde_json::Value::Object(
                m.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect(),
            )
        }),
    ]
}

fn arb_tool_use_block() -> impl Strategy<Value = ContentBlock> {
    ("[a-z0-9_]{5,20}", "[a-z_]{3,20}", arb_json_value())
        .prop_map(|(id, name, input)| ContentBlock::ToolUse { id, name, input })
}

fn arb_tool_result_block() -> impl Strategy<Value = ContentBlock> {
    ("[a-z0-9_]{5,20}", "[a-zA-Z0-9 _.!?,]{0,100}", any::<bool>()).prop_map(
        |(tool_use_id, content, is_error)| ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        },
    )
}

fn arb_user_message() -> impl Strategy<Value = LlmMessage> {
    proptest::collection::vec(
        prop_oneof![3 => arb_text_block(), 2 => arb_tool_result_block()],
        1..6,
    )
    .prop_map(|content| LlmMessage {
        role: MessageRole::User,
        content,
    })
}

fn arb_assistant_message() -> impl Strategy<Value = LlmMessage> {
    proptest::collection::vec(prop_oneof![3 => arb_text_block(), 3 => arb_tool_use_block()], 1..6)
        .prop_map(|content| LlmMessage {
            role: MessageRole::Assistant,
            content,
        })
}

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    prop_oneof![arb_user_message(), arb_assistant_message()]
}

fn count_tool_results(messages: &[LlmMessage]) -> usize {
    messages
        .iter()
        .flat_map(|m| m.content.iter())
        .filter(|b| matches!(b, ContentBlock::ToolResult { .. }))
        .count()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Chat-message translation never yields an empty message list
    #[test]
    fn prop_openai_translate_never_empty(msg in arb_message()) {
        let translated = OpenAIService::translate_message(&msg);
        prop_assert!(!translated.is_empty());
    }

    /// Each tool result becomes one `tool` message with the originating id
    #[test]
    fn prop_openai_tool_results_fan_out(messages in proptest::collection::vec(arb_message(), 1..6)) {
        let request = LlmRequest::new("system", messages.clone());
        let wire = OpenAIService::translate_request("m", &request, None);

        let tool_messages: Vec<_> = wire.messages.iter().filter(|m| m.role == "tool").collect();
        prop_assert_eq!(tool_messages.len(), count_tool_results(&messages));
        prop_assert!(tool_messages.iter().all(|m| m.tool_call_id.is_some()));
    }

    /// System prompt is injected exactly once, in first position
    #[test]
    fn prop_openai_single_system_message(messages in proptest::collection::vec(arb_message(), 0..6)) {
        let request = LlmRequest::new("Be helpful.", messages);
        let wire = OpenAIService::translate_request("m", &request, None);

        prop_assert_eq!(wire.messages.iter().filter(|m| m.role == "system").count(), 1);
        prop_assert_eq!(wire.messages[0].role.as_str(), "system");
    }

    /// Content-block translation keeps one wire message per history turn
    #[test]
    fn prop_anthropic_preserves_turns(messages in proptest::collection::vec(arb_message(), 0..6)) {
        let request = LlmRequest::new("Be helpful.", messages.clone());
        let wire = AnthropicService::translate_request("m", &request);

        prop_assert_eq!(wire.messages.len(), messages.len());
        for (wire_msg, msg) in wire.messages.iter().zip(&messages) {
            prop_assert_eq!(wire_msg.content.len(), msg.content.len());
        }
        prop_assert_eq!(wire.system.as_deref(), Some("Be helpful."));
    }

    /// Normalized tool calls keep order and ids (content-block)
    #[test]
    fn prop_anthropic_tool_call_order(ids in proptest::collection::vec("[a-z0-9]{4,12}", 0..6)) {
        let content = ids
            .iter()
            .map(|id| AnthropicContentBlock::ToolUse {
                id: id.clone(),
                name: "tool".to_string(),
                input: serde_json::json!({}),
            })
            .collect();
        let resp = AnthropicResponse {
            content,
            stop_reason: Some("tool_use".to_string()),
            usage: AnthropicUsage { input_tokens: 1, output_tokens: 1 },
        };

        let normalized = AnthropicService::normalize_response(resp);
        let got: Vec<String> = normalized.tool_calls().into_iter().map(|c| c.id).collect();
        prop_assert_eq!(got, ids);
    }

    /// Normalized tool calls keep order and ids (chat-message)
    #[test]
    fn prop_openai_tool_call_order(ids in proptest::collection::vec("[a-z0-9]{4,12}", 1..6)) {
        let tool_calls = ids
            .iter()
            .map(|id| OpenAIToolCall {
                id: id.clone(),
                r#type: "function".to_string(),
                function: OpenAIFunctionCall {
                    name: "tool".to_string(),
                    arguments: "{}".to_string(),
                },
            })
            .collect();
        let resp = OpenAIResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: Some(tool_calls),
                    tool_call_id: None,
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: Some(OpenAIUsage { prompt_tokens: 1, completion_tokens: 1 }),
        };

        let normalized = OpenAIService::normalize_response(resp).unwrap();
        let got: Vec<String> = normalized.tool_calls().into_iter().map(|c| c.id).collect();
        prop_assert_eq!(got, ids);
    }
}
