//! Bounded model/tool turn-taking
//!
//! The loop alternates gateway calls and tool execution until the model
//! answers without requesting tools or the iteration budget runs out.

use crate::llm::{
    ContentBlock, LlmError, LlmMessage, LlmRequest, LlmService, MessageRole, ToolCall, ToolResult,
    Usage,
};
use crate::tools::ToolRegistry;
use std::sync::Arc;

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Reply used when the budget runs out before the model produces a final answer
pub const EXHAUSTED_RESPONSE: &str =
    "I've reached the maximum number of steps. Here's what I found so far...";

/// Result of one loop run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolLoopOutcome {
    pub response: String,
    /// Every tool call the model made, across all iterations, in order
    pub tool_calls: Vec<ToolCall>,
    /// One result per entry in `tool_calls`, same order
    pub tool_results: Vec<ToolResult>,
    pub usage: Usage,
    /// Gateway calls made
    pub iterations: usize,
    /// True when the budget ran out and `response` is the fallback text
    pub exhausted: bool,
}

/// Tool invocation loop over one gateway handle and one tool registry
pub struct ToolLoop {
    llm: Arc<dyn LlmService>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    max_tokens: Option<u32>,
}

impl ToolLoop {
    pub fn new(llm: Arc<dyn LlmService>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tokens: None,
        }
    }

    /// Set the iteration budget (at least one gateway call is always made)
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run the loop from `messages` until a final answer or budget exhaustion.
    ///
    /// Gateway errors propagate to the caller. Tool failures never do; they are
    /// fed back to the model as error results.
    pub async fn run(
        &self,
        mut messages: Vec<LlmMessage>,
        system: &str,
    ) -> Result<ToolLoopOutcome, LlmError> {
        let definitions = self.tools.definitions();
        let mut all_calls = Vec::new();
        let mut all_results = Vec::new();
        let mut usage = Usage::default();

        for iteration in 1..=self.max_iterations {
            let mut request =
                LlmRequest::new(system, messages.clone()).with_tools(definitions.clone());
            if let Some(max_tokens) = self.max_tokens {
                request = request.with_max_tokens(max_tokens);
            }

            let response = self.llm.complete(&request).await?;
            usage.add(response.usage);

            let calls = response.tool_calls();
            if calls.is_empty() {
                tracing::debug!(iteration, "Tool loop finished");
                return Ok(ToolLoopOutcome {
                    response: response.text(),
                    tool_calls: all_calls,
                    tool_results: all_results,
                    usage,
                    iterations: iteration,
                    exhausted: false,
                });
            }

            tracing::debug!(iteration, tool_calls = calls.len(), "Executing tool calls");

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                results.push(self.execute(call).await);
            }

            messages.push(LlmMessage {
                role: MessageRole::Assistant,
                content: response.content,
            });
            messages.push(LlmMessage {
                role: MessageRole::User,
                content: results.iter().cloned().map(ContentBlock::from).collect(),
            });

            all_calls.extend(calls);
            all_results.extend(results);
        }

        Ok(exhausted_outcome(
            all_calls,
            all_results,
            usage,
            self.max_iterations,
        ))
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.tools.execute(&call.name, call.input.clone()).await {
            Ok(output) => {
                tracing::debug!(tool = %call.name, tool_use_id = %call.id, "Tool succeeded");
                ToolResult::success(call.id.clone(), output)
            }
            Err(e) => {
                tracing::warn!(
                    tool = %call.name,
                    tool_use_id = %call.id,
                    error = %e,
                    "Tool failed"
                );
                ToolResult::error(call.id.clone(), e.to_string())
            }
        }
    }
}

/// Degraded outcome returned when the iteration budget is spent
pub fn exhausted_outcome(
    tool_calls: Vec<ToolCall>,
    tool_results: Vec<ToolResult>,
    usage: Usage,
    iterations: usize,
) -> ToolLoopOutcome {
    tracing::warn!(
        iterations,
        tool_calls = tool_calls.len(),
        "Tool loop hit iteration limit"
    );
    ToolLoopOutcome {
        response: EXHAUSTED_RESPONSE.to_string(),
        tool_calls,
        tool_results,
        usage,
        iterations,
        exhausted: true,
    }
}
