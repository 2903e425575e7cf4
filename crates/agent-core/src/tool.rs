//! Capability System
//!
//! Descriptors, invocation requests and results for capabilities advertised
//! by a remote tool server, plus the registry trait that reaches it.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};

/// Capability descriptor as advertised to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique name within the catalog
    pub name: String,

    /// Human-readable description (shown to the LLM)
    #[serde(default)]
    pub description: String,

    /// JSON Schema for the arguments
    pub input_schema: Value,
}

impl CapabilityDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Check outgoing arguments against the top level of the input schema.
    ///
    /// Only schemas whose `type` is `object` are checked: the arguments must
    /// be an object and every `required` key must be present. Anything else
    /// is left to the server.
    pub fn validate(&self, arguments: &Value) -> Result<()> {
        let expects_object = self
            .input_schema
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == "object");

        if !expects_object {
            return Ok(());
        }

        let Some(args) = arguments.as_object() else {
            return Err(AgentError::ToolValidation(format!(
                "{}: arguments must be an object, got {}",
                self.name,
                json_kind(arguments)
            )));
        };

        let required = self
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                return Err(AgentError::ToolValidation(format!(
                    "{}: missing required parameter: {key}",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reject catalogs where two capabilities share a name
pub fn ensure_unique_names(catalog: &[CapabilityDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();
    for descriptor in catalog {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(AgentError::Session(format!(
                "duplicate capability name in catalog: {}",
                descriptor.name
            )));
        }
    }
    Ok(())
}

/// Tool call request from the LLM (one invocation block)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Capability name
    pub name: String,

    /// Argument payload, passed through untouched
    #[serde(default)]
    pub arguments: Value,

    /// Provider-assigned call ID
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// User-visible line announcing this call
    pub fn describe(&self) -> String {
        format!("[Calling tool {} with args {}]", self.name, self.arguments)
    }
}

/// Opaque payload returned by a capability invocation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResult {
    /// Raw content as returned by the server
    pub content: Value,

    /// Server flagged the result as a tool-level error
    #[serde(default)]
    pub is_error: bool,
}

impl CapabilityResult {
    pub const fn new(content: Value) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Plain text result
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Value::String(text.into()))
    }

    pub const fn with_error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    /// Render the payload as text for reinsertion into a conversation
    pub fn to_text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item.get("text").and_then(Value::as_str) {
                    Some(text) => text.to_string(),
                    None => item.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

/// Connection to a capability server
///
/// `connect` and `close` bracket the session; `discover` is called once per
/// session and `invoke` once per invocation block, never retried.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    /// Establish the underlying connection
    async fn connect(&mut self) -> Result<()>;

    /// List every capability the server advertises
    async fn discover(&self) -> Result<Vec<CapabilityDescriptor>>;

    /// Invoke one capability
    async fn invoke(&self, call: &ToolCall) -> Result<CapabilityResult>;

    /// Release the connection. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
