//! Orchestration state machine
//!
//! Pure routing and transitions; node execution lives in the runtime.

mod effect;
mod event;
mod intent;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use intent::{Intent, UnknownIntent};
pub use state::{
    AgentNode, ChatMessage, ConversationState, ConversationType, JsonMap, Phase, UserProfile,
};
pub use transition::{route, transition, TransitionError, TransitionResult};
