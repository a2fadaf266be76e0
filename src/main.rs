//! Concierge CLI
//!
//! Answers one query and prints the result as JSON. Caller context (user,
//! conversation, prior turns) may be passed as JSON in `CONCIERGE_CONTEXT`.

use concierge::llm::{LlmConfig, ModelRegistry};
use concierge::runtime::InMemoryMemory;
use concierge::tools::ToolRegistry;
use concierge::{HandleContext, Orchestrator, OrchestratorConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        return Err("usage: concierge <query>".into());
    }

    let mut ctx: HandleContext = match std::env::var("CONCIERGE_CONTEXT") {
        Ok(raw) => serde_json::from_str(&raw)?,
        Err(_) => HandleContext::default(),
    };
    let conversation_id = ctx
        .conversation_id
        .get_or_insert_with(|| uuid::Uuid::new_v4().to_string());
    tracing::info!(%conversation_id, "Handling query");

    // Initialize LLM registry
    let llm_config = LlmConfig::from_env();
    let llm_registry = ModelRegistry::new(&llm_config);

    if llm_registry.has_models() {
        tracing::info!(
            provider = %llm_registry.provider(),
            models = ?llm_registry.available_models(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!(
            "No LLM API key configured. Set {}.",
            llm_registry.provider().api_key_env_var()
        );
    }

    let orchestrator = Orchestrator::from_registry(
        &llm_registry,
        Arc::new(ToolRegistry::new()),
        Arc::new(InMemoryMemory::new()),
        OrchestratorConfig::from_env(),
    )?;

    let result = orchestrator.handle(&query, ctx).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
