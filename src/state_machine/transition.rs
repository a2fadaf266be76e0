//! Pure routing and transition functions

use super::{AgentNode, Effect, Event, Intent, Phase};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, PartialEq)]
pub struct TransitionResult {
    pub new_phase: Phase,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(phase: Phase) -> Self {
        Self {
            new_phase: phase,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Select the terminal node for a classified intent.
///
/// Total over every input; a missing intent asks the user to clarify.
pub fn route(intent: Option<Intent>) -> AgentNode {
    match intent {
        Some(Intent::Knowledge) => AgentNode::Knowledge,
        Some(Intent::Onboarding) => AgentNode::Onboarding,
        Some(Intent::TeamAnalysis) => AgentNode::TeamAnalysis,
        Some(Intent::Evaluator) => AgentNode::Evaluator,
        Some(Intent::DirectResponse) => AgentNode::DirectResponse,
        Some(Intent::Clarification) | None => AgentNode::Clarification,
    }
}

/// Pure transition function: same phase and event always give the same result
pub fn transition(phase: &Phase, event: Event) -> Result<TransitionResult, TransitionError> {
    match (phase, event) {
        (Phase::ClassifyIntent, Event::Classified { intent, .. }) => {
            let node = route(intent);
            Ok(TransitionResult::new(Phase::Running(node)).with_effect(Effect::RunNode(node)))
        }
        (Phase::Running(node), Event::NodeCompleted) => {
            Ok(TransitionResult::new(Phase::Completed(*node)))
        }
        (Phase::Running(node), Event::NodeFailed { error }) => {
            Ok(TransitionResult::new(Phase::Failed { node: *node, error }))
        }
        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} in {phase:?}"
        ))),
    }
}
