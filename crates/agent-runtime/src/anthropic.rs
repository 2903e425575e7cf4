//! Anthropic LLM Provider
//!
//! Implementation of `LlmProvider` over the Anthropic Messages API with
//! native tool use.

use std::time::Duration;

use agent_core::{
    conversation::{Conversation, Turn},
    error::{AgentError, Result},
    provider::{ContentBlock, FinishReason, GenerationOptions, LlmProvider, ModelResponse, TokenUsage},
    tool::{CapabilityDescriptor, ToolCall},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Anthropic provider configuration
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,

    /// API root, without the `/v1/messages` suffix
    pub base_url: String,

    /// `anthropic-version` header value
    pub api_version: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".into(),
            api_version: "2023-06-01".into(),
            timeout_secs: 120,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Anthropic LLM provider
pub struct AnthropicProvider {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    /// Create with the public API endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(AnthropicConfig::new(api_key))
    }

    /// Create from configuration
    pub fn from_config(config: AnthropicConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Convert turns to Anthropic messages
    fn convert_turns(conversation: &Conversation) -> Vec<WireMessage> {
        conversation
            .turns()
            .iter()
            .map(|turn: &Turn| WireMessage {
                role: turn.role.as_str(),
                content: turn.render_text(),
            })
            .collect()
    }

    fn convert_tools(catalog: &[CapabilityDescriptor]) -> Vec<WireTool<'_>> {
        catalog
            .iter()
            .map(|d| WireTool {
                name: &d.name,
                description: (!d.description.is_empty()).then_some(d.description.as_str()),
                input_schema: &d.input_schema,
            })
            .collect()
    }

    /// Convert an Anthropic response to a model response
    fn convert_response(response: MessagesResponse) -> ModelResponse {
        let blocks = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                WireBlock::Text { text } => Some(ContentBlock::Text { text }),
                WireBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse(ToolCall::new(name, input).with_id(id)))
                }
                WireBlock::Other => None,
            })
            .collect();

        ModelResponse {
            blocks,
            model: response.model,
            finish_reason: response.stop_reason.map(|r| match r.as_str() {
                "end_turn" => FinishReason::Stop,
                "max_tokens" => FinishReason::Length,
                "tool_use" => FinishReason::ToolUse,
                "stop_sequence" => FinishReason::StopSequence,
                _ => FinishReason::Other(r),
            }),
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        }
    }

    /// Map a non-success status to an error carrying the API's own message
    fn status_error(status: StatusCode, body: &str) -> AgentError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| body.to_string());
        let message = format!("{status}: {message}");

        match status.as_u16() {
            401 | 403 => AgentError::Auth(message),
            429 => AgentError::RateLimited(message),
            500..=599 => AgentError::ProviderUnavailable(message),
            _ => AgentError::Provider(message),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "Anthropic"
    }

    async fn generate(
        &self,
        conversation: &Conversation,
        catalog: Option<&[CapabilityDescriptor]>,
        options: &GenerationOptions,
    ) -> Result<ModelResponse> {
        let request = MessagesRequest {
            model: &options.model,
            max_tokens: options.max_tokens,
            messages: Self::convert_turns(conversation),
            tools: catalog.map(Self::convert_tools),
            system: options.system_prompt.as_deref(),
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("Anthropic response: {e}")))?;

        tracing::debug!(
            model = parsed.model.as_deref().unwrap_or(&options.model),
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("none"),
            blocks = parsed.content.len(),
            "Anthropic response"
        );

        Ok(Self::convert_response(parsed))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct WireTool<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    input_schema: &'a Value,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<WireBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::CapabilityResult;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::from_config(AnthropicConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    fn catalog() -> Vec<CapabilityDescriptor> {
        vec![CapabilityDescriptor::new(
            "get_weather",
            "Current weather",
            json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        )]
    }

    #[test]
    fn test_config_defaults() {
        let config = AnthropicConfig::new("k");
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.api_version, "2023-06-01");
    }

    #[test]
    fn test_turn_conversion() {
        let mut conversation = Conversation::with_query("weather?");
        conversation.push(Turn::capability_result(CapabilityResult::new(json!([
            {"type": "text", "text": "sunny"}
        ]))));

        let converted = AnthropicProvider::convert_turns(&conversation);
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[1].role, "user");
        assert_eq!(converted[1].content, "sunny");
    }

    #[test]
    fn test_status_error_mapping() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let err = AnthropicProvider::status_error(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, AgentError::Auth(ref m) if m.contains("invalid x-api-key")));

        let err = AnthropicProvider::status_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, AgentError::RateLimited(_)));

        let err = AnthropicProvider::status_error(StatusCode::BAD_REQUEST, "bad");
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_generate_parses_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "claude-3-5-sonnet-20241022",
                "content": [
                    {"type": "text", "text": "Checking."},
                    {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Paris"}},
                    {"type": "thinking", "thinking": "hmm"}
                ],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 12, "output_tokens": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server)
            .generate(
                &Conversation::with_query("what's the weather"),
                Some(&catalog()),
                &GenerationOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.blocks,
            vec![
                ContentBlock::text("Checking."),
                ContentBlock::ToolUse(ToolCall::new("get_weather", json!({"city": "Paris"})).with_id("toolu_1")),
            ]
        );
        assert_eq!(response.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(response.usage.map(|u| u.output_tokens), Some(7));
    }

    #[tokio::test]
    async fn test_tools_sent_only_with_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ok"}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let conversation = Conversation::with_query("hi");
        let options = GenerationOptions::default();
        provider.generate(&conversation, Some(&catalog()), &options).await.unwrap();
        provider.generate(&conversation, None, &options).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);

        let with_tools: Value = requests[0].body_json().unwrap();
        assert_eq!(with_tools["tools"][0]["name"], "get_weather");
        assert_eq!(with_tools["max_tokens"], 1000);
        assert_eq!(with_tools["messages"][0], json!({"role": "user", "content": "hi"}));

        let without_tools: Value = requests[1].body_json().unwrap();
        assert!(without_tools.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate(&Conversation::with_query("hi"), None, &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ProviderUnavailable(ref m) if m.contains("Overloaded")));
    }
}
