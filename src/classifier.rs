//! Intent classification
//!
//! One gateway call per query. The model answers `intent|confidence`; anything
//! that does not parse falls back to a direct response.

use crate::llm::{LlmMessage, LlmRequest, LlmService, MessageRole};
use crate::state_machine::{ChatMessage, ConversationState, Intent};
use std::sync::Arc;
use thiserror::Error;

/// Intent and confidence used whenever classification cannot produce one
pub const FALLBACK: (Intent, f32) = (Intent::DirectResponse, 0.5);

const MAX_TOKENS: u32 = 50;

/// Prior turns shown to the classifier
const HISTORY_TURNS: usize = 4;

const SYSTEM_PROMPT: &str = r#"You are an intent classifier for an internal company AI assistant.
Your job is to determine which specialized agent should handle a user's query.

Available intents:
- knowledge: Questions about company documentation, processes, projects, tools, or past decisions
- onboarding: Questions from new employees, requests for onboarding help, introductions to the company
- team_analysis: Questions about team performance, metrics, workload, velocity, bottlenecks
- evaluator: Requests to review, grade, or critique the quality of a response or piece of work
- direct_response: Simple greetings, thanks, or questions that don't require specialized knowledge
- clarification: When the query is too vague or ambiguous to classify

Use the recent conversation, if any, to resolve follow-up questions.

Respond with ONLY the intent name, followed by a confidence score from 0-1.
Format: intent_name|confidence

Examples:
User: "How do we deploy to production?"
Response: knowledge|0.95

User: "I just joined the team, where do I start?"
Response: onboarding|0.9

User: "What's our team's velocity this sprint?"
Response: team_analysis|0.95

User: "Hi!"
Response: direct_response|1.0

User: "help"
Response: clarification|0.7
"#;

/// Why a classifier reply could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationParseError {
    #[error("missing '|' separator in {0:?}")]
    MissingSeparator(String),
    #[error("unknown intent token {0:?}")]
    UnknownIntent(String),
    #[error("invalid confidence {0:?}")]
    InvalidConfidence(String),
}

/// What the classifier sees besides the query
#[derive(Debug, Clone, Default)]
pub struct ClassificationContext {
    /// Most recent turns, oldest first
    pub history: Vec<ChatMessage>,
    pub is_new_employee: bool,
    pub is_in_onboarding_flow: bool,
}

impl ClassificationContext {
    pub fn from_state(state: &ConversationState) -> Self {
        let skip = state.messages.len().saturating_sub(HISTORY_TURNS);
        Self {
            history: state.messages[skip..].to_vec(),
            is_new_employee: state.is_new_employee(),
            is_in_onboarding_flow: state.is_in_onboarding_flow(),
        }
    }
}

/// Parse a raw `intent|confidence` reply.
///
/// The token is trimmed and lowercased; finite confidences are clamped to [0, 1].
pub fn parse_classification(raw: &str) -> Result<(Intent, f32), ClassificationParseError> {
    let raw = raw.trim();
    let (token, confidence) = raw
        .split_once('|')
        .ok_or_else(|| ClassificationParseError::MissingSeparator(raw.to_string()))?;

    let token = token.trim().to_lowercase();
    let intent = token
        .parse::<Intent>()
        .map_err(|_| ClassificationParseError::UnknownIntent(token.clone()))?;

    let confidence = confidence.trim();
    let value = confidence
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ClassificationParseError::InvalidConfidence(confidence.to_string()))?;

    Ok((intent, value.clamp(0.0, 1.0)))
}

fn user_message(query: &str, ctx: &ClassificationContext) -> String {
    let mut message = String::new();

    if !ctx.history.is_empty() {
        message.push_str("Recent conversation:\n");
        for turn in &ctx.history {
            let role = match turn.role {
                MessageRole::User => "User",
                MessageRole::Assistant => "Assistant",
                MessageRole::System => "System",
            };
            message.push_str(&format!("{role}: {}\n", turn.content));
        }
        message.push('\n');
    }

    message.push_str(&format!("User query: {query}"));
    if ctx.is_new_employee {
        message.push_str("\n[Context: User is a new employee in onboarding]");
    }
    if ctx.is_in_onboarding_flow {
        message.push_str("\n[Context: User is currently in an onboarding flow]");
    }
    message
}

/// Assigns an intent to each query using the fast gateway model
/// Outcome of one classification call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
    /// The gateway failed or the reply did not parse, so `FALLBACK` was used
    pub degraded: bool,
}

impl Classification {
    fn fallback() -> Self {
        Self {
            intent: FALLBACK.0,
            confidence: FALLBACK.1,
            degraded: true,
        }
    }
}

pub struct IntentClassifier {
    llm: Arc<dyn LlmService>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    /// Classify a query. Never fails: gateway errors and unparseable replies
    /// both degrade to a direct response at 0.5 confidence.
    pub async fn classify(&self, query: &str, ctx: &ClassificationContext) -> (Intent, f32) {
        let c = self.classify_detailed(query, ctx).await;
        (c.intent, c.confidence)
    }

    /// Like `classify`, but reports whether the fallback was used
    pub async fn classify_detailed(
        &self,
        query: &str,
        ctx: &ClassificationContext,
    ) -> Classification {
        let request = LlmRequest::new(SYSTEM_PROMPT, vec![LlmMessage::user(user_message(query, ctx))])
            .with_max_tokens(MAX_TOKENS);

        let reply = match self.llm.complete(&request).await {
            Ok(response) => response.text(),
            Err(e) => {
                tracing::warn!(error = %e, "Intent classification request failed");
                return Classification::fallback();
            }
        };

        match parse_classification(&reply) {
            Ok((intent, confidence)) => {
                tracing::debug!(%intent, confidence, "Classified query");
                Classification {
                    intent,
                    confidence,
                    degraded: false,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable classification");
                Classification::fallback()
            }
        }
    }
}
