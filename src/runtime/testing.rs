//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::{
    CapabilityContext, CapabilityError, CapabilityProvider, CapabilityResponse, ConversationMemory,
    MemoryError, MemoryStore,
};
use super::{Capabilities, Orchestrator};
use crate::llm::{
    ContentBlock, FinishReason, LlmError, LlmRequest, LlmResponse, LlmService, Usage,
};
use crate::state_machine::JsonMap;
use crate::tools::{input_schema, Tool, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock LLM
// ============================================================================

/// Mock gateway that returns queued responses
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a plain text response
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse::text_only(text));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Response requesting the given `(id, name, input)` tool calls, in order
pub fn tool_use_response(calls: &[(&str, &str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::tool_use(*id, *name, input.clone()))
            .collect(),
        finish_reason: FinishReason::ToolUse,
        usage: Usage::default(),
    }
}

// ============================================================================
// Mock tools
// ============================================================================

/// Tool with a fixed outcome that records its inputs
pub struct MockTool {
    name: String,
    output: Result<String, ToolError>,
    inputs: Mutex<Vec<Value>>,
}

impl MockTool {
    pub fn ok(name: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            output: Ok(output.to_string()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            output: Err(ToolError::Execution(message.to_string())),
            ..Self::ok(name, "")
        }
    }

    pub fn recorded_inputs(&self) -> Vec<Value> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        input_schema(&[])
    }

    async fn run(&self, input: Value) -> Result<String, ToolError> {
        self.inputs.lock().unwrap().push(input);
        self.output.clone()
    }
}

/// Tool that panics when run
pub struct PanickingTool {
    name: String,
}

impl PanickingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        "Always panics".to_string()
    }

    fn input_schema(&self) -> Value {
        input_schema(&[])
    }

    async fn run(&self, _input: Value) -> Result<String, ToolError> {
        panic!("{} blew up", self.name);
    }
}

// ============================================================================
// Mock capabilities
// ============================================================================

/// Capability provider with a fixed response that records its calls
pub struct MockCapability {
    response: CapabilityResponse,
    calls: Mutex<Vec<(String, CapabilityContext)>>,
}

impl MockCapability {
    pub fn new(response: &str) -> Self {
        Self {
            response: CapabilityResponse::text(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Add a source document; non-object values are ignored
    pub fn with_source(mut self, source: Value) -> Self {
        if let Value::Object(map) = source {
            self.response.sources.push(map);
        }
        self
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(q, _)| q.clone())
            .collect()
    }

    pub fn recorded_contexts(&self) -> Vec<CapabilityContext> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }
}

#[async_trait]
impl CapabilityProvider for MockCapability {
    async fn process(
        &self,
        query: &str,
        ctx: &CapabilityContext,
    ) -> Result<CapabilityResponse, CapabilityError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), ctx.clone()));
        Ok(self.response.clone())
    }
}

/// Capability provider that always fails
pub struct FailingCapability {
    message: String,
}

impl FailingCapability {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl CapabilityProvider for FailingCapability {
    async fn process(
        &self,
        _query: &str,
        _ctx: &CapabilityContext,
    ) -> Result<CapabilityResponse, CapabilityError> {
        Err(CapabilityError::Failed(self.message.clone()))
    }
}

/// Capability provider that panics mid-request
pub struct PanickingCapability;

#[async_trait]
impl CapabilityProvider for PanickingCapability {
    async fn process(
        &self,
        _query: &str,
        _ctx: &CapabilityContext,
    ) -> Result<CapabilityResponse, CapabilityError> {
        panic!("provider bug");
    }
}

// ============================================================================
// Mock memory
// ============================================================================

/// Memory store with a fixed context that records stored exchanges
#[derive(Default)]
pub struct MockMemory {
    context: JsonMap,
    fail_fetch: bool,
    stored: Mutex<Vec<ConversationMemory>>,
    stored_notify: Notify,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, key: &str, value: Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }

    /// Make `get_context_for_query` fail
    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn recorded_stores(&self) -> Vec<ConversationMemory> {
        self.stored.lock().unwrap().clone()
    }

    /// Wait until at least `count` exchanges were stored (storage runs in a spawned task)
    pub async fn wait_for_stores(&self, count: usize) -> Vec<ConversationMemory> {
        let wait = async {
            loop {
                let stored = self.recorded_stores();
                if stored.len() >= count {
                    return stored;
                }
                self.stored_notify.notified().await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for memory storage")
    }
}

#[async_trait]
impl MemoryStore for MockMemory {
    async fn get_context_for_query(
        &self,
        _query: &str,
        _user_id: Option<&str>,
        _conversation_id: Option<&str>,
    ) -> Result<JsonMap, MemoryError> {
        if self.fail_fetch {
            return Err(MemoryError::Unavailable("mock outage".to_string()));
        }
        Ok(self.context.clone())
    }

    async fn store_conversation_memory(
        &self,
        memory: ConversationMemory,
    ) -> Result<(), MemoryError> {
        self.stored.lock().unwrap().push(memory);
        self.stored_notify.notify_one();
        Ok(())
    }
}

// ============================================================================
// Test harness
// ============================================================================

/// Orchestrator wired to mocks, with handles to inspect them
pub struct TestHarness {
    pub fast: Arc<MockLlm>,
    pub capability: Arc<MockCapability>,
    pub memory: Arc<MockMemory>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            fast: Arc::new(MockLlm::new("fast")),
            capability: Arc::new(MockCapability::new("capability answer")),
            memory: Arc::new(MockMemory::new()),
        }
    }

    pub fn with_capability(mut self, capability: MockCapability) -> Self {
        self.capability = Arc::new(capability);
        self
    }

    pub fn with_memory(mut self, memory: MockMemory) -> Self {
        self.memory = Arc::new(memory);
        self
    }

    pub fn build(&self) -> Orchestrator {
        Orchestrator::new(
            self.fast.clone(),
            Capabilities::uniform(self.capability.clone()),
            self.memory.clone(),
        )
    }

    /// Orchestrator whose capability nodes all fail
    pub fn build_failing(&self, message: &str) -> Orchestrator {
        Orchestrator::new(
            self.fast.clone(),
            Capabilities::uniform(Arc::new(FailingCapability::new(message))),
            self.memory.clone(),
        )
    }

    /// Orchestrator whose capability nodes all panic
    pub fn build_panicking(&self) -> Orchestrator {
        Orchestrator::new(
            self.fast.clone(),
            Capabilities::uniform(Arc::new(PanickingCapability)),
            self.memory.clone(),
        )
    }
}
