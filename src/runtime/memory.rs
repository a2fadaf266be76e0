//! Memory store implementations and topic extraction

use super::traits::{ConversationMemory, MemoryError, MemoryStore};
use crate::state_machine::{ChatMessage, JsonMap};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

const MAX_TOPICS: usize = 3;

/// Items returned per memory source
const ITEMS_PER_SOURCE: usize = 5;

/// Interactions shorter than this with no topics are not worth remembering
const SIGNIFICANT_QUERY_CHARS: usize = 50;

const RESPONSE_SUMMARY_CHARS: usize = 500;

/// Messages kept per conversation transcript
const MAX_TRANSCRIPT_MESSAGES: usize = 20;

/// Interactions kept per user
const MAX_USER_ITEMS: usize = 20;

/// Upper bound on formatted context, in characters
const MAX_CONTEXT_CHARS: usize = 8000;

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("deployment", &["deploy", "release", "production", "staging"]),
    ("authentication", &["auth", "login", "sso", "oauth"]),
    ("database", &["database", "db", "sql", "migration"]),
    ("api", &["api", "endpoint", "rest", "graphql"]),
    ("testing", &["test", "testing", "qa", "quality"]),
    ("ci_cd", &["ci", "cd", "pipeline", "build"]),
    ("monitoring", &["monitor", "alert", "metric", "log"]),
    ("security", &["security", "permission", "access", "role"]),
];

/// Topics mentioned in an exchange, by substring match against a fixed keyword table.
/// At most three, in table order.
pub fn extract_topics(query: &str, response: &str) -> Vec<String> {
    let text = format!("{query} {response}").to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(topic, _)| (*topic).to_string())
        .take(MAX_TOPICS)
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Render a memory context map as prompt text.
///
/// Recent conversation first, then user, team and organization items (three
/// each, 200 characters per item).
pub fn format_context_for_prompt(context: &JsonMap) -> String {
    let mut sections = Vec::new();

    if let Some(messages) = context
        .get("short_term")
        .and_then(|st| st.get("messages"))
        .and_then(Value::as_array)
        .filter(|m| !m.is_empty())
    {
        let lines: Vec<String> = messages
            .iter()
            .filter_map(|m| {
                let role = m.get("role")?.as_str()?;
                let content = m.get("content")?.as_str()?;
                Some(format!("- {role}: {}", truncate_chars(content, 200)))
            })
            .collect();
        sections.push(format!("Recent Conversation:\n{}", lines.join("\n")));
    }

    for (key, label) in [("user", "User"), ("team", "Team"), ("org", "Organization")] {
        let Some(items) = context.get(key).and_then(Value::as_array) else {
            continue;
        };
        let lines: Vec<String> = items
            .iter()
            .take(3)
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .map(|text| format!("- {}", truncate_chars(text, 200)))
            .collect();
        if !lines.is_empty() {
            sections.push(format!("{label} Context:\n{}", lines.join("\n")));
        }
    }

    let formatted = sections.join("\n\n");
    if formatted.chars().count() > MAX_CONTEXT_CHARS {
        format!(
            "{}\n[Context truncated...]",
            truncate_chars(&formatted, MAX_CONTEXT_CHARS)
        )
    } else {
        formatted
    }
}

/// Memory store that remembers nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMemory;

#[async_trait]
impl MemoryStore for NoopMemory {
    async fn get_context_for_query(
        &self,
        _query: &str,
        _user_id: Option<&str>,
        _conversation_id: Option<&str>,
    ) -> Result<JsonMap, MemoryError> {
        Ok(JsonMap::new())
    }

    async fn store_conversation_memory(
        &self,
        _memory: ConversationMemory,
    ) -> Result<(), MemoryError> {
        Ok(())
    }
}

/// Process-local memory: per-conversation transcripts and per-user interactions
#[derive(Debug, Default)]
pub struct InMemoryMemory {
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
    interactions: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn last_n<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items[items.len().saturating_sub(n)..].to_vec()
}

/// Drop the oldest entries beyond `cap`
fn keep_last<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        items.drain(..items.len() - cap);
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemory {
    async fn get_context_for_query(
        &self,
        _query: &str,
        user_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<JsonMap, MemoryError> {
        let mut context = JsonMap::new();

        if let Some(conversation_id) = conversation_id {
            let conversations = self.conversations.read().await;
            let messages = conversations
                .get(conversation_id)
                .map(|m| last_n(m, ITEMS_PER_SOURCE))
                .unwrap_or_default();
            context.insert("short_term".to_string(), json!({ "messages": messages }));
        }

        if let Some(user_id) = user_id {
            let interactions = self.interactions.read().await;
            let items = interactions
                .get(user_id)
                .map(|i| last_n(i, ITEMS_PER_SOURCE))
                .unwrap_or_default();
            context.insert("user".to_string(), Value::Array(items));
        }

        Ok(context)
    }

    async fn store_conversation_memory(
        &self,
        memory: ConversationMemory,
    ) -> Result<(), MemoryError> {
        if let Some(conversation_id) = &memory.conversation_id {
            let mut conversations = self.conversations.write().await;
            let transcript = conversations.entry(conversation_id.clone()).or_default();
            transcript.push(ChatMessage::user(memory.query.clone()));
            transcript.push(ChatMessage::assistant(memory.response.clone()));
            keep_last(transcript, MAX_TRANSCRIPT_MESSAGES);
        }

        let significant =
            memory.query.chars().count() > SIGNIFICANT_QUERY_CHARS || !memory.topics.is_empty();
        if let (Some(user_id), true) = (&memory.user_id, significant) {
            let summary = truncate_chars(&memory.response, RESPONSE_SUMMARY_CHARS);
            let item = json!({
                "text": format!("Q: {}\nA: {summary}", memory.query),
                "topics": memory.topics,
                "agent": memory.agent,
                "at": chrono::Utc::now().to_rfc3339(),
            });
            let mut interactions = self.interactions.write().await;
            let items = interactions.entry(user_id.clone()).or_default();
            items.push(item);
            keep_last(items, MAX_USER_ITEMS);
        }

        tracing::debug!(
            conversation_id = ?memory.conversation_id,
            topics = ?memory.topics,
            "Stored conversation memory"
        );
        Ok(())
    }
}
