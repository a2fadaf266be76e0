//! Effects produced by state transitions

use super::AgentNode;

/// Work the executor performs after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Execute a terminal node
    RunNode(AgentNode),
}
