//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Collaborator failures keep the collaborator's own message; the variant
/// only records which side of the exchange failed.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Capability registry transport or protocol failure
    #[error("Registry error: {0}")]
    Registry(String),

    /// Capability registry could not be reached
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Tool not found in the advertised catalog
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool arguments rejected before invocation
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed on the remote side
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// A collaborator call exceeded the configured timeout
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// Parse error (unexpected wire payload)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => "The AI service is currently unavailable.".into(),
            Self::Registry(msg) => format!("The tool server encountered an error: {msg}"),
            Self::RegistryUnavailable(_) => "The tool server is currently unavailable.".into(),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::Timeout { operation, .. } => format!("The {operation} took too long to respond."),
            Self::RateLimited(_) => "Too many requests to the AI service. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your API key.".into(),
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
