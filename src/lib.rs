//! Concierge - multi-agent orchestration engine
//!
//! Routes a natural-language query to one specialized capability: classify
//! the intent, route through a small state machine, optionally run a bounded
//! tool loop, over either of two LLM wire protocols.

pub mod classifier;
pub mod llm;
pub mod runtime;
pub mod state_machine;
pub mod tool_loop;
pub mod tools;

pub use runtime::{HandleContext, HandleResult, Orchestrator, OrchestratorConfig};
