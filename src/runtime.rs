//! Runtime for answering queries
//!
//! `Orchestrator::handle` is the entry point: fetch memory, run the state
//! machine, convert failures into an apology, spawn memory storage.

mod assistant;
mod executor;
mod memory;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use assistant::AssistantCapability;
pub use executor::{
    capability_context, Capabilities, OrchestrationError, StateMachine, CLARIFICATION_RESPONSE,
};
pub use memory::{extract_topics, format_context_for_prompt, InMemoryMemory, NoopMemory};
pub use traits::*;

use crate::llm::{LlmError, LlmService, ModelRegistry};
use crate::state_machine::{
    AgentNode, ChatMessage, ConversationState, ConversationType, Intent, JsonMap, UserProfile,
};
use crate::tool_loop::DEFAULT_MAX_ITERATIONS;
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reply used when a node fails
pub const APOLOGY_RESPONSE: &str =
    "I encountered an error processing your request. Please try again.";

/// Reply used when a node completes without producing text
const EMPTY_RESPONSE: &str = "I'm sorry, I couldn't process your request.";

/// Tuning for the capability nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub max_tool_iterations: usize,
    /// Output cap for capability model calls; provider default when unset
    pub max_tokens: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: DEFAULT_MAX_ITERATIONS,
            max_tokens: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_tool_iterations: std::env::var("CONCIERGE_MAX_TOOL_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tool_iterations),
            max_tokens: std::env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

/// Caller-supplied context for one query
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HandleContext {
    pub user: UserProfile,
    pub conversation_id: Option<String>,
    pub conversation_type: ConversationType,
    /// Prior turns, oldest first
    pub messages: Vec<ChatMessage>,
    /// Node that answered the previous turn
    pub previous_agent: Option<AgentNode>,
}

impl HandleContext {
    fn into_state(self, query: &str, memory_context: JsonMap) -> ConversationState {
        ConversationState {
            messages: self.messages,
            previous_agent: self.previous_agent,
            user: self.user,
            conversation_id: self.conversation_id,
            conversation_type: self.conversation_type,
            memory_context,
            ..ConversationState::new(query)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandleMetadata {
    pub intent_confidence: f32,
    /// Classification failed and the direct-response fallback was used
    pub classification_degraded: bool,
}

/// What `Orchestrator::handle` returns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandleResult {
    pub response: String,
    pub sources: Vec<JsonMap>,
    pub active_agent: Option<AgentNode>,
    pub intent: Option<Intent>,
    pub metadata: HandleMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Entry point: one query in, one answer out
pub struct Orchestrator {
    machine: StateMachine,
    memory: Arc<dyn MemoryStore>,
}

impl Orchestrator {
    pub fn new(
        fast: Arc<dyn LlmService>,
        capabilities: Capabilities,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        Self {
            machine: StateMachine::new(fast, capabilities),
            memory,
        }
    }

    /// Wire every capability node to an `AssistantCapability` over the
    /// registry's default model. Classification and direct replies use the
    /// fast model.
    pub fn from_registry(
        registry: &ModelRegistry,
        tools: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryStore>,
        config: OrchestratorConfig,
    ) -> Result<Self, LlmError> {
        let default = registry.require_default()?;
        let fast = registry.fast().unwrap_or_else(|| default.clone());

        let assistant = |node: AgentNode| -> Arc<dyn CapabilityProvider> {
            Arc::new(
                AssistantCapability::new(node, default.clone(), tools.clone())
                    .with_max_iterations(config.max_tool_iterations)
                    .with_max_tokens(config.max_tokens),
            )
        };
        let capabilities = Capabilities {
            knowledge: assistant(AgentNode::Knowledge),
            onboarding: assistant(AgentNode::Onboarding),
            team_analysis: assistant(AgentNode::TeamAnalysis),
            evaluator: assistant(AgentNode::Evaluator),
        };

        Ok(Self::new(fast, capabilities, memory))
    }

    /// Answer one query. Never fails: node errors become an apology with
    /// `error` set.
    pub async fn handle(&self, query: &str, ctx: HandleContext) -> HandleResult {
        let memory_context = match self
            .memory
            .get_context_for_query(query, ctx.user.id.as_deref(), ctx.conversation_id.as_deref())
            .await
        {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(error = %e, "Memory lookup failed, continuing without context");
                JsonMap::new()
            }
        };

        let mut state = ctx.into_state(query, memory_context);
        let outcome = self.machine.run(&mut state).await;
        let metadata = HandleMetadata {
            intent_confidence: state.intent_confidence,
            classification_degraded: state.classification_degraded,
        };

        match outcome {
            Ok(()) => {
                let response = state
                    .response
                    .take()
                    .unwrap_or_else(|| EMPTY_RESPONSE.to_string());
                let agent = state.active_agent.unwrap_or(AgentNode::Clarification);

                self.spawn_store(&state, agent, &response);

                tracing::info!(
                    %agent,
                    intent = ?state.intent,
                    confidence = state.intent_confidence,
                    "Query processed"
                );

                HandleResult {
                    response,
                    sources: state.sources.take().unwrap_or_default(),
                    active_agent: Some(agent),
                    intent: state.intent,
                    metadata,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Orchestrator failed");
                let error = e.to_string();
                if let Some(node) = e.node() {
                    state.fail(node, error.clone());
                }
                HandleResult {
                    response: APOLOGY_RESPONSE.to_string(),
                    sources: Vec::new(),
                    active_agent: state.active_agent,
                    intent: state.intent,
                    metadata,
                    error: Some(error),
                }
            }
        }
    }

    /// Store the exchange without blocking the response
    fn spawn_store(&self, state: &ConversationState, agent: AgentNode, response: &str) {
        let memory = Arc::clone(&self.memory);
        let record = ConversationMemory {
            conversation_id: state.conversation_id.clone(),
            user_id: state.user.id.clone(),
            query: state.query.clone(),
            response: response.to_string(),
            agent,
            topics: extract_topics(&state.query, response),
        };

        tokio::spawn(async move {
            if let Err(e) = memory.store_conversation_memory(record).await {
                tracing::warn!(error = %e, "Failed to store conversation memory");
            }
        });
    }
}
