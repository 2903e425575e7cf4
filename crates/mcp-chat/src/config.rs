//! Application Configuration
//!
//! Everything is read once at startup and handed down as values.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    provider::{GenerationOptions, DEFAULT_MODEL},
    reasoning::{AgentConfig, ConversationScope, InvocationPolicy},
};

const DEFAULT_MCP_URL: &str = "http://127.0.0.1:8000/mcp";
const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";

/// Startup configuration
#[derive(Clone)]
pub struct Config {
    /// Model gateway credential
    pub api_key: String,

    pub model: String,

    pub max_tokens: u32,

    pub anthropic_base_url: String,

    /// Capability registry endpoint
    pub mcp_url: String,

    /// Applied to every HTTP request and every collaborator call
    pub request_timeout_secs: u64,

    pub invocation_policy: InvocationPolicy,

    pub scope: ConversationScope,

    /// Keep the interactive loop alive after a failed query
    pub continue_on_error: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("mcp_url", &self.mcp_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("invocation_policy", &self.invocation_policy)
            .field("scope", &self.scope)
            .field("continue_on_error", &self.continue_on_error)
            .finish()
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("ANTHROPIC_API_KEY")
            .ok_or_else(|| AgentError::Config("ANTHROPIC_API_KEY is not set".into()))?;

        Ok(Self {
            api_key,
            model: get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            max_tokens: parse_number(get("ANTHROPIC_MAX_TOKENS"), "ANTHROPIC_MAX_TOKENS", 1000)?,
            anthropic_base_url: get("ANTHROPIC_BASE_URL").unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.into()),
            mcp_url: get("MCP_SERVER_URL").unwrap_or_else(|| DEFAULT_MCP_URL.into()),
            request_timeout_secs: parse_number(
                get("AGENT_REQUEST_TIMEOUT_SECS"),
                "AGENT_REQUEST_TIMEOUT_SECS",
                120,
            )?,
            invocation_policy: get("AGENT_INVOCATION_POLICY")
                .map(|v| v.parse::<InvocationPolicy>())
                .transpose()?
                .unwrap_or_default(),
            scope: get("AGENT_CONVERSATION_SCOPE")
                .map(|v| v.parse::<ConversationScope>())
                .transpose()?
                .unwrap_or_default(),
            continue_on_error: parse_bool(get("AGENT_CONTINUE_ON_ERROR"), "AGENT_CONTINUE_ON_ERROR", true)?,
        })
    }

    pub fn generation(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            ..GenerationOptions::default()
        }
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            generation: self.generation(),
            invocation_policy: self.invocation_policy,
            scope: self.scope,
            call_timeout: Some(Duration::from_secs(self.request_timeout_secs)),
        }
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    value.map_or(Ok(default), |v| {
        v.trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("{key} must be a positive number, got '{v}'")))
    })
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    let Some(v) = value else {
        return Ok(default);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AgentError::Config(format!("{key} must be true or false, got '{v}'"))),
    }
}
