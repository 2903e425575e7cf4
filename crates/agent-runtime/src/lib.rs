//! # agent-runtime
//!
//! Concrete collaborators for the agent-core orchestrator.
//!
//! ## Providers
//!
//! - **Anthropic** (default): Messages API with native tool use
//!
//! ## Registries
//!
//! - **MCP**: Streamable HTTP capability server
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use agent_runtime::{Agent, AgentConfig, AnthropicProvider, McpClient, Session};
//!
//! let provider = Arc::new(AnthropicProvider::new(api_key)?);
//! let session = Session::open(McpClient::new("http://127.0.0.1:8000/mcp")).await?;
//! let agent = Agent::new(provider, session, AgentConfig::default());
//!
//! let answer = agent.process_query("What is the weather in Paris?").await?;
//! agent.shutdown().await?;
//! ```

#[cfg(feature = "anthropic")]
pub mod anthropic;
pub mod mcp;

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use mcp::{McpClient, McpClientOptions};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentConfig, AgentError, CapabilityRegistry, Conversation, LlmProvider, Result, Session,
};
