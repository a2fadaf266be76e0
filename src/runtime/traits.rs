//! Trait abstractions for the orchestrator's collaborators
//!
//! These traits enable testing the executor with mock implementations.

use crate::llm::LlmError;
use crate::state_machine::{AgentNode, ChatMessage, JsonMap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Capability providers
// ============================================================================

/// Inputs handed to a capability provider.
///
/// Only the fields the provider's node needs are populated; the rest stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapabilityContext {
    pub user_id: Option<String>,
    pub memory_context: JsonMap,
    pub messages: Vec<ChatMessage>,
    pub user_name: Option<String>,
    pub user_role: Option<String>,
    pub user_department: Option<String>,
    pub user_team: Option<String>,
}

/// What a capability provider returns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResponse {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<JsonMap>,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl CapabilityResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("model request failed: {0}")]
    Gateway(#[from] LlmError),
    #[error("{0}")]
    Failed(String),
}

/// A specialized answer generator (knowledge, onboarding, team analysis, evaluator)
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn process(
        &self,
        query: &str,
        ctx: &CapabilityContext,
    ) -> Result<CapabilityResponse, CapabilityError>;
}

#[async_trait]
impl<T: CapabilityProvider + ?Sized> CapabilityProvider for Arc<T> {
    async fn process(
        &self,
        query: &str,
        ctx: &CapabilityContext,
    ) -> Result<CapabilityResponse, CapabilityError> {
        (**self).process(query, ctx).await
    }
}

// ============================================================================
// Memory
// ============================================================================

/// One answered exchange, handed to the memory store after the response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationMemory {
    pub conversation_id: Option<String>,
    pub user_id: Option<String>,
    pub query: String,
    pub response: String,
    pub agent: AgentNode,
    pub topics: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory backend unavailable: {0}")]
    Unavailable(String),
}

/// Memory context lookup before routing and fire-and-forget storage after
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Context relevant to `query`, as an opaque JSON object
    async fn get_context_for_query(
        &self,
        query: &str,
        user_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<JsonMap, MemoryError>;

    /// Record an answered exchange
    async fn store_conversation_memory(&self, memory: ConversationMemory)
        -> Result<(), MemoryError>;
}

#[async_trait]
impl<T: MemoryStore + ?Sized> MemoryStore for Arc<T> {
    async fn get_context_for_query(
        &self,
        query: &str,
        user_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<JsonMap, MemoryError> {
        (**self)
            .get_context_for_query(query, user_id, conversation_id)
            .await
    }

    async fn store_conversation_memory(
        &self,
        memory: ConversationMemory,
    ) -> Result<(), MemoryError> {
        (**self).store_conversation_memory(memory).await
    }
}
