//! Orchestration state types

use super::Intent;
use crate::llm::{LlmMessage, MessageRole};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// JSON object, used for memory context, sources and metadata
pub type JsonMap = Map<String, Value>;

// ============================================================================
// Nodes and phases
// ============================================================================

/// Terminal node that produces the answer for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentNode {
    Knowledge,
    Onboarding,
    TeamAnalysis,
    Evaluator,
    DirectResponse,
    Clarification,
}

impl AgentNode {
    pub const ALL: [AgentNode; 6] = [
        AgentNode::Knowledge,
        AgentNode::Onboarding,
        AgentNode::TeamAnalysis,
        AgentNode::Evaluator,
        AgentNode::DirectResponse,
        AgentNode::Clarification,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentNode::Knowledge => "knowledge",
            AgentNode::Onboarding => "onboarding",
            AgentNode::TeamAnalysis => "team_analysis",
            AgentNode::Evaluator => "evaluator",
            AgentNode::DirectResponse => "direct_response",
            AgentNode::Clarification => "clarification",
        }
    }
}

impl fmt::Display for AgentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run currently is
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Initial phase; nothing has been decided yet
    ClassifyIntent,
    /// A terminal node has been selected and is executing
    Running(AgentNode),
    /// The node produced a response
    Completed(AgentNode),
    /// The node failed
    Failed { node: AgentNode, error: String },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed(_) | Phase::Failed { .. })
    }

    /// Node selected for this run, once routing has happened
    pub fn node(&self) -> Option<AgentNode> {
        match self {
            Phase::ClassifyIntent => None,
            Phase::Running(node) | Phase::Completed(node) | Phase::Failed { node, .. } => {
                Some(*node)
            }
        }
    }
}

// ============================================================================
// Conversation record
// ============================================================================

/// A prior turn supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for LlmMessage {
    fn from(msg: &ChatMessage) -> Self {
        match msg.role {
            MessageRole::System => LlmMessage::system(msg.content.clone()),
            MessageRole::User => LlmMessage::user(msg.content.clone()),
            MessageRole::Assistant => LlmMessage::assistant(msg.content.clone()),
        }
    }
}

/// Who is asking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    #[default]
    Chat,
    Onboarding,
}

/// Per-query record threaded through classification and the terminal node.
///
/// Created fresh for every query and dropped once the caller has read the
/// result. After a terminal node runs `response` is set on success; on
/// failure the caller records the error with `fail`.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub query: String,
    pub intent: Option<Intent>,
    /// Advisory only; never used for routing
    pub intent_confidence: f32,
    /// Classification fell back instead of reflecting a model answer
    pub classification_degraded: bool,
    pub active_agent: Option<AgentNode>,
    /// Node that answered the previous turn of this conversation
    pub previous_agent: Option<AgentNode>,
    pub user: UserProfile,
    pub conversation_id: Option<String>,
    pub conversation_type: ConversationType,
    pub memory_context: JsonMap,
    pub response: Option<String>,
    pub sources: Option<Vec<JsonMap>>,
    pub error: Option<String>,
}

impl ConversationState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            query: query.into(),
            intent: None,
            intent_confidence: 0.0,
            classification_degraded: false,
            active_agent: None,
            previous_agent: None,
            user: UserProfile::default(),
            conversation_id: None,
            conversation_type: ConversationType::default(),
            memory_context: JsonMap::new(),
            response: None,
            sources: None,
            error: None,
        }
    }

    pub fn is_new_employee(&self) -> bool {
        self.conversation_type == ConversationType::Onboarding
    }

    pub fn is_in_onboarding_flow(&self) -> bool {
        self.previous_agent == Some(AgentNode::Onboarding)
    }

    /// Record a node's answer
    pub fn complete(&mut self, node: AgentNode, response: String, sources: Vec<JsonMap>) {
        self.active_agent = Some(node);
        self.response = Some(response);
        self.sources = (!sources.is_empty()).then_some(sources);
        self.error = None;
    }

    /// Record a node's failure
    pub fn fail(&mut self, node: AgentNode, error: String) {
        self.active_agent = Some(node);
        self.response = None;
        self.sources = None;
        self.error = Some(error);
    }
}
