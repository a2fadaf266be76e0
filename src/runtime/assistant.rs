//! Gateway-backed capability provider
//!
//! Answers with the tool invocation loop under a node-specific system prompt.
//! Used for every capability node when no dedicated provider is wired in.

use super::memory::format_context_for_prompt;
use super::traits::{CapabilityContext, CapabilityError, CapabilityProvider, CapabilityResponse};
use crate::llm::{LlmMessage, LlmService};
use crate::state_machine::{AgentNode, JsonMap};
use crate::tool_loop::ToolLoop;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const RESPONSE_FORMAT: &str = "RESPONSE FORMAT:\n\
- Start with a brief summary (1-2 sentences).\n\
- Use clear Markdown with headings when helpful.\n\
- Prefer bullets for lists or steps.\n\
- Say so plainly when you do not know.";

fn role_prompt(node: AgentNode) -> &'static str {
    match node {
        AgentNode::Onboarding => {
            "You are an onboarding guide for new employees. Help them find their \
             footing: who to talk to, what to read first, and how things get done here."
        }
        AgentNode::TeamAnalysis => {
            "You are a team analytics assistant. Answer questions about team \
             performance, workload, velocity and bottlenecks using the data available to you."
        }
        AgentNode::Evaluator => {
            "You are a reviewer. Assess the quality of the response or work the user \
             shares, point out gaps, and suggest concrete improvements."
        }
        AgentNode::Knowledge | AgentNode::DirectResponse | AgentNode::Clarification => {
            "You are a knowledge assistant for internal company use. Answer questions \
             about documentation, processes, projects, tools and past decisions."
        }
    }
}

/// Capability provider running the tool loop over the default model
pub struct AssistantCapability {
    node: AgentNode,
    tool_loop: ToolLoop,
}

impl AssistantCapability {
    pub fn new(node: AgentNode, llm: Arc<dyn LlmService>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            node,
            tool_loop: ToolLoop::new(llm, tools),
        }
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.tool_loop = self.tool_loop.with_max_iterations(max_iterations);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.tool_loop = self.tool_loop.with_max_tokens(max_tokens);
        self
    }

    fn system_prompt(&self, ctx: &CapabilityContext) -> String {
        let mut sections = vec![role_prompt(self.node).to_string()];

        let profile: Vec<String> = [
            ("Name", &ctx.user_name),
            ("Role", &ctx.user_role),
            ("Department", &ctx.user_department),
            ("Team", &ctx.user_team),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("- {label}: {v}")))
        .collect();
        if !profile.is_empty() {
            sections.push(format!("About the user:\n{}", profile.join("\n")));
        }

        let memory = format_context_for_prompt(&ctx.memory_context);
        if !memory.is_empty() {
            sections.push(memory);
        }

        sections.push(RESPONSE_FORMAT.to_string());
        sections.join("\n\n")
    }
}

#[async_trait]
impl CapabilityProvider for AssistantCapability {
    async fn process(
        &self,
        query: &str,
        ctx: &CapabilityContext,
    ) -> Result<CapabilityResponse, CapabilityError> {
        let mut messages: Vec<LlmMessage> = ctx.messages.iter().map(LlmMessage::from).collect();
        messages.push(LlmMessage::user(query));

        let outcome = self
            .tool_loop
            .run(messages, &self.system_prompt(ctx))
            .await?;

        let mut metadata = JsonMap::new();
        metadata.insert("iterations".to_string(), json!(outcome.iterations));
        metadata.insert("tool_calls".to_string(), json!(outcome.tool_calls.len()));
        metadata.insert("exhausted".to_string(), json!(outcome.exhausted));
        metadata.insert("usage".to_string(), json!(outcome.usage));

        Ok(CapabilityResponse {
            response: outcome.response,
            sources: Vec::new(),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MessageRole};
    use crate::runtime::testing::{tool_use_response, MockLlm, MockTool};
    use crate::state_machine::ChatMessage;

    #[tokio::test]
    async fn test_process_runs_tool_loop() {
        let llm = Arc::new(MockLlm::new("default"));
        llm.queue_response(tool_use_response(&[("t1", "search_docs", json!({"q": "deploy"}))]));
        llm.queue_text("Deploys go through the release pipeline.");

        let tools = Arc::new(
            ToolRegistry::new().with_tool(Arc::new(MockTool::ok("search_docs", "Deploy guide: ..."))),
        );
        let capability = AssistantCapability::new(AgentNode::Knowledge, llm.clone(), tools);

        let ctx = CapabilityContext {
            messages: vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello!")],
            ..CapabilityContext::default()
        };
        let result = capability.process("How do we deploy?", &ctx).await.unwrap();

        assert_eq!(result.response, "Deploys go through the release pipeline.");
        assert_eq!(result.metadata["tool_calls"], 1);
        assert_eq!(result.metadata["exhausted"], false);

        let first = &llm.recorded_requests()[0];
        assert_eq!(first.messages.len(), 3);
        assert_eq!(first.messages[2].role, MessageRole::User);
        assert_eq!(first.messages[2].text(), "How do we deploy?");
        assert_eq!(first.tools.len(), 1);
    }

    #[tokio::test]
    async fn test_system_prompt_includes_profile_and_memory() {
        let llm = Arc::new(MockLlm::new("default"));
        llm.queue_text("Welcome!");
        let capability =
            AssistantCapability::new(AgentNode::Onboarding, llm.clone(), Arc::new(ToolRegistry::new()));

        let mut memory_context = JsonMap::new();
        memory_context.insert("user".to_string(), json!([{ "text": "Asked about VPN setup" }]));
        let ctx = CapabilityContext {
            user_name: Some("Dana".to_string()),
            user_department: Some("Platform".to_string()),
            memory_context,
            ..CapabilityContext::default()
        };
        capability.process("where do I start?", &ctx).await.unwrap();

        let system = llm.recorded_requests()[0].system_text();
        assert!(system.starts_with("You are an onboarding guide"));
        assert!(system.contains("- Name: Dana\n- Department: Platform"));
        assert!(system.contains("User Context:\n- Asked about VPN setup"));
        assert!(!system.contains("- Role:"));
    }

    #[tokio::test]
    async fn test_gateway_error_becomes_capability_error() {
        let llm = Arc::new(MockLlm::new("default"));
        llm.queue_error(LlmError::auth("bad key"));
        let capability =
            AssistantCapability::new(AgentNode::Evaluator, llm, Arc::new(ToolRegistry::new()));

        let err = capability
            .process("review this", &CapabilityContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Gateway(_)));
    }
}
