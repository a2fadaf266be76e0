//! Events that drive the orchestration state machine

use super::Intent;

/// Things that happen during one run
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Classifier finished. `intent` is `None` when no intent could be assigned.
    Classified {
        intent: Option<Intent>,
        confidence: f32,
    },
    /// The selected node produced a response
    NodeCompleted,
    /// The selected node failed
    NodeFailed { error: String },
}
