//! LLM Provider Strategy Pattern
//!
//! Defines the Model Gateway: a common interface for language-model backends
//! that can see a capability catalog and answer with text and invocation
//! blocks.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = AnthropicProvider::new(config);
//!
//! // Offer the catalog on the first call, withhold it on follow-ups
//! let response = provider.generate(&conversation, Some(&catalog), &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::error::Result;
use crate::tool::{CapabilityDescriptor, ToolCall};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier
    pub model: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature; provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,

    /// System prompt, sent separately from the turns
    #[serde(default)]
    pub system_prompt: Option<String>,
}

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

const fn default_max_tokens() -> u32 {
    1000
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            max_tokens: default_max_tokens(),
            temperature: None,
            system_prompt: None,
        }
    }
}

/// One unit of a model response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse(ToolCall),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_use(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::ToolUse(ToolCall::new(name, arguments))
    }
}

/// Full, non-streamed response from a model
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Content blocks in the order the model produced them
    pub blocks: Vec<ContentBlock>,

    /// Model that generated this response
    #[serde(default)]
    pub model: Option<String>,

    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,

    /// Token usage statistics (if available)
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    pub const fn new(blocks: Vec<ContentBlock>) -> Self {
        Self {
            blocks,
            model: None,
            finish_reason: None,
            usage: None,
        }
    }

    /// Text blocks only, in order
    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::ToolUse(_) => None,
        })
    }

    /// Number of invocation blocks
    pub fn invocation_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolUse(_)))
            .count()
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    StopSequence,
    Other(String),
}

/// Strategy trait for LLM providers
///
/// When `catalog` is `None` the model is offered no capability and is
/// expected to answer with text only.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Generate one response for the conversation so far
    async fn generate(
        &self,
        conversation: &Conversation,
        catalog: Option<&[CapabilityDescriptor]>,
        options: &GenerationOptions,
    ) -> Result<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.max_tokens, 1000);
        assert_eq!(opts.model, DEFAULT_MODEL);
        assert!(opts.temperature.is_none());
    }

    #[test]
    fn test_text_blocks_skip_invocations() {
        let response = ModelResponse::new(vec![
            ContentBlock::text("Let me check."),
            ContentBlock::tool_use("get_weather", json!({"city": "Paris"})),
            ContentBlock::text("One moment."),
        ]);

        let texts: Vec<_> = response.text_blocks().collect();
        assert_eq!(texts, vec!["Let me check.", "One moment."]);
        assert_eq!(response.invocation_count(), 1);
    }
}
