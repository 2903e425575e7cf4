//! mcp-chat
//!
//! Interactive command-line agent: answers typed queries with an Anthropic
//! model that can call the tools of an MCP server.

mod config;
mod repl;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{reasoning::Agent, session::Session};
use agent_runtime::{AnthropicConfig, AnthropicProvider, McpClient, McpClientOptions};

use crate::config::Config;
use crate::repl::AgentResponder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with answers on stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    // Initialize LLM provider
    let provider = Arc::new(AnthropicProvider::from_config(
        AnthropicConfig::new(config.api_key.clone())
            .with_base_url(config.anthropic_base_url.clone())
            .with_timeout_secs(config.request_timeout_secs),
    )?);

    // Connect to the tool server; nothing to clean up if this fails
    let registry = McpClient::with_options(
        &config.mcp_url,
        McpClientOptions {
            timeout_secs: config.request_timeout_secs,
            ..McpClientOptions::default()
        },
    );
    let session = match Session::open(registry).await {
        Ok(session) => session,
        Err(e) => {
            println!("Failed to connect to MCP server: {e}");
            return Err(e.into());
        }
    };
    println!("Connected to server with tools: {:?}", session.tool_names());

    let agent = Agent::new(provider, session, config.agent_config());

    let mut responder = AgentResponder::new(&agent);
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let outcome = repl::run(
        &mut responder,
        config.continue_on_error,
        repl::stdin_lines(),
        tokio::io::stdout(),
        interrupt,
    )
    .await;

    // Always release the session, whatever ended the loop
    if let Err(e) = agent.shutdown().await {
        tracing::warn!(error = %e, "Failed to close MCP session cleanly");
    }

    outcome
}
