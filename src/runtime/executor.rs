//! Node execution for one query
//!
//! Drives the pure transition function: classify, route, run exactly one
//! terminal node, record the outcome on the conversation state.

use super::traits::{CapabilityContext, CapabilityError, CapabilityProvider};
use crate::classifier::{ClassificationContext, IntentClassifier};
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService};
use crate::state_machine::{
    transition, AgentNode, ConversationState, Effect, Event, Phase, TransitionError,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;

pub const CLARIFICATION_RESPONSE: &str = "## Clarification Needed\n\
I want to help, but I need a bit more detail.\n\n\
**Could you clarify one of these?**\n\
- The specific team, project, or timeframe\n\
- The exact metric or output you want\n\
- Any constraints or context to consider";

const DIRECT_RESPONSE_MAX_TOKENS: u32 = 500;

fn direct_response_prompt(user_name: &str) -> String {
    format!(
        "You are a friendly AI assistant for internal company use. \
         The user's name is {user_name}. Keep responses brief and friendly.\n\n\
         RESPONSE FORMAT:\n\
         - Use clear Markdown with headings when helpful.\n\
         - Start with a brief summary (1-2 sentences).\n\
         - Prefer bullets for lists or steps.\n\
         - Keep responses structured and scannable."
    )
}

/// A terminal node failed
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("{node} failed: {source}")]
    Capability {
        node: AgentNode,
        source: CapabilityError,
    },
    #[error("{node} failed: {source}")]
    Gateway { node: AgentNode, source: LlmError },
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl OrchestrationError {
    /// Node that was running when the error happened
    pub fn node(&self) -> Option<AgentNode> {
        match self {
            OrchestrationError::Capability { node, .. } | OrchestrationError::Gateway { node, .. } => {
                Some(*node)
            }
            OrchestrationError::Transition(_) => None,
        }
    }
}

/// Providers for the four capability nodes
#[derive(Clone)]
pub struct Capabilities {
    pub knowledge: Arc<dyn CapabilityProvider>,
    pub onboarding: Arc<dyn CapabilityProvider>,
    pub team_analysis: Arc<dyn CapabilityProvider>,
    pub evaluator: Arc<dyn CapabilityProvider>,
}

impl Capabilities {
    /// Same provider behind every capability node
    pub fn uniform(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            knowledge: provider.clone(),
            onboarding: provider.clone(),
            team_analysis: provider.clone(),
            evaluator: provider,
        }
    }
}

/// Build the provider context for `node`, carrying only the fields it uses
pub fn capability_context(node: AgentNode, state: &ConversationState) -> CapabilityContext {
    let mut ctx = CapabilityContext {
        user_id: state.user.id.clone(),
        memory_context: state.memory_context.clone(),
        messages: state.messages.clone(),
        ..CapabilityContext::default()
    };

    match node {
        AgentNode::Onboarding => {
            ctx.user_name = state.user.name.clone();
            ctx.user_role = state.user.role.clone();
            ctx.user_department = state.user.department.clone();
        }
        AgentNode::TeamAnalysis => {
            ctx.user_team = state.user.team.clone();
        }
        _ => {}
    }
    ctx
}

/// Classification plus one terminal node, for a single query
pub struct StateMachine {
    classifier: IntentClassifier,
    fast: Arc<dyn LlmService>,
    capabilities: Capabilities,
}

impl StateMachine {
    pub fn new(fast: Arc<dyn LlmService>, capabilities: Capabilities) -> Self {
        Self {
            classifier: IntentClassifier::new(fast.clone()),
            fast,
            capabilities,
        }
    }

    /// Run one query to completion.
    ///
    /// On success `state.response` and `state.active_agent` are set. On
    /// failure the error is returned and the state is left for the caller to
    /// record; there are no retries.
    pub async fn run(&self, state: &mut ConversationState) -> Result<(), OrchestrationError> {
        let ctx = ClassificationContext::from_state(state);
        let classification = self.classifier.classify_detailed(&state.query, &ctx).await;
        let (intent, confidence) = (classification.intent, classification.confidence);
        state.intent = Some(intent);
        state.intent_confidence = confidence;
        state.classification_degraded = classification.degraded;

        let routed = transition(
            &Phase::ClassifyIntent,
            Event::Classified {
                intent: Some(intent),
                confidence,
            },
        )?;

        let mut phase = routed.new_phase;
        for effect in routed.effects {
            let Effect::RunNode(node) = effect;
            tracing::info!(%node, %intent, confidence, "Running node");

            let outcome = self.run_node(node, state).await;
            let event = match &outcome {
                Ok(()) => Event::NodeCompleted,
                Err(e) => Event::NodeFailed {
                    error: e.to_string(),
                },
            };
            phase = transition(&phase, event)?.new_phase;

            if let Phase::Failed { node, error } = &phase {
                tracing::error!(%node, %error, "Node failed");
            }
            outcome?;
        }

        Ok(())
    }

    async fn run_node(
        &self,
        node: AgentNode,
        state: &mut ConversationState,
    ) -> Result<(), OrchestrationError> {
        match node {
            AgentNode::Knowledge => {
                self.run_capability(node, &self.capabilities.knowledge, state)
                    .await
            }
            AgentNode::Onboarding => {
                self.run_capability(node, &self.capabilities.onboarding, state)
                    .await
            }
            AgentNode::TeamAnalysis => {
                self.run_capability(node, &self.capabilities.team_analysis, state)
                    .await
            }
            AgentNode::Evaluator => {
                self.run_capability(node, &self.capabilities.evaluator, state)
                    .await
            }
            AgentNode::DirectResponse => {
                let response = self
                    .direct_response(state)
                    .await
                    .map_err(|source| OrchestrationError::Gateway { node, source })?;
                state.complete(node, response, vec![]);
                Ok(())
            }
            AgentNode::Clarification => {
                state.complete(node, CLARIFICATION_RESPONSE.to_string(), vec![]);
                Ok(())
            }
        }
    }

    async fn run_capability(
        &self,
        node: AgentNode,
        provider: &Arc<dyn CapabilityProvider>,
        state: &mut ConversationState,
    ) -> Result<(), OrchestrationError> {
        let ctx = capability_context(node, state);
        let outcome = match AssertUnwindSafe(provider.process(&state.query, &ctx))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(CapabilityError::Failed(format!("{node} panicked: {reason}")))
            }
        };
        let result = outcome.map_err(|source| OrchestrationError::Capability { node, source })?;
        state.complete(node, result.response, result.sources);
        Ok(())
    }

    async fn direct_response(&self, state: &ConversationState) -> Result<String, LlmError> {
        let user_name = state.user.name.as_deref().unwrap_or("there");
        let request = LlmRequest::new(
            direct_response_prompt(user_name),
            vec![LlmMessage::user(state.query.clone())],
        )
        .with_max_tokens(DIRECT_RESPONSE_MAX_TOKENS);

        Ok(self.fast.complete(&request).await?.text())
    }
}
