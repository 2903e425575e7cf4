//! Streamable HTTP MCP Client
//!
//! `CapabilityRegistry` over MCP's Streamable HTTP transport: JSON-RPC 2.0
//! requests as HTTP POSTs, answered either with a JSON body or with a
//! `text/event-stream` body carrying the response as an SSE event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    tool::{CapabilityDescriptor, CapabilityRegistry, CapabilityResult, ToolCall},
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

const SESSION_HEADER: &str = "mcp-session-id";

/// Client identity and transport settings
#[derive(Clone, Debug)]
pub struct McpClientOptions {
    pub client_name: String,
    pub client_version: String,
    pub protocol_version: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for McpClientOptions {
    fn default() -> Self {
        Self {
            client_name: "mcp-chat".into(),
            client_version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: "2025-06-18".into(),
            timeout_secs: 120,
        }
    }
}

/// Server identity reported by `initialize`
#[derive(Clone, Debug, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// MCP tool as listed on the wire
#[derive(Debug, Deserialize)]
struct ToolInfo {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object"})
}

impl From<ToolInfo> for CapabilityDescriptor {
    fn from(tool: ToolInfo) -> Self {
        Self::new(tool.name, tool.description.unwrap_or_default(), tool.input_schema)
    }
}

#[derive(Debug, Deserialize)]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<ToolInfo>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// MCP client using Streamable HTTP transport
pub struct McpClient {
    endpoint: String,
    client: reqwest::Client,
    session_id: Option<String>,
    server_info: Option<ServerInfo>,
    connected: bool,
    request_id: AtomicU64,
    options: McpClientOptions,
}

impl McpClient {
    /// Create a client for an MCP endpoint (e.g. `http://127.0.0.1:8000/mcp`)
    pub fn new(endpoint: &str) -> Self {
        Self::with_options(endpoint, McpClientOptions::default())
    }

    pub fn with_options(endpoint: &str, options: McpClientOptions) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            session_id: None,
            server_info: None,
            connected: false,
            request_id: AtomicU64::new(1),
            options,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Session id issued by the server, once connected
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub const fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.options.timeout_secs)
    }

    /// POST one JSON-RPC message; non-success statuses become errors
    async fn post(&self, message: &Value) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .timeout(self.timeout())
            .json(message);

        if let Some(session_id) = &self.session_id {
            request = request
                .header(SESSION_HEADER, session_id)
                .header("mcp-protocol-version", &self.options.protocol_version);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::RegistryUnavailable(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Registry(format!("HTTP {status}: {body}")));
        }

        Ok(response)
    }

    /// Send a request and return the matching JSON-RPC response message
    async fn send_request(&self, method: &str, params: Value) -> Result<(Value, HeaderMap)> {
        let id = self.next_id();
        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        tracing::debug!(method, id, "MCP request");
        let response = self.post(&message).await?;
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        // `initialize` needs the session id header
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Registry(format!("reading {method} response: {e}")))?;

        let reply = if is_stream {
            parse_event_stream(&body, id)?
        } else {
            serde_json::from_str(&body).map_err(|e| AgentError::Parse(format!("{method} response: {e}")))?
        };

        Ok((reply, headers))
    }

    /// Request whose JSON-RPC errors are registry failures
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (reply, _) = self.send_request(method, params).await?;
        split_reply(reply, method).map_err(|e| {
            AgentError::Registry(format!("{method} failed (code {}): {}", e.code, e.message))
        })?
    }

    /// Send a notification (no response expected)
    async fn send_notification(&self, method: &str) -> Result<()> {
        let message = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": {}
        });

        self.post(&message).await?;
        Ok(())
    }
}

/// Separate a JSON-RPC reply into its result or its error.
///
/// The outer error is the server's JSON-RPC error; the inner one is a reply
/// that carries neither `error` nor `result`.
fn split_reply(mut reply: Value, method: &str) -> std::result::Result<Result<Value>, RpcError> {
    if let Some(error) = reply.get("error") {
        let error = serde_json::from_value(error.clone()).unwrap_or_else(|_| RpcError {
            code: -1,
            message: error.to_string(),
        });
        return Err(error);
    }

    Ok(reply
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| AgentError::Parse(format!("missing result in {method} response"))))
}

/// Find the response to request `id` in an SSE body
fn parse_event_stream(body: &str, id: u64) -> Result<Value> {
    let mut events = Vec::new();
    let mut data: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.is_empty() {
            if !data.is_empty() {
                events.push(data.join("\n"));
                data.clear();
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if !data.is_empty() {
        events.push(data.join("\n"));
    }

    events
        .iter()
        .filter_map(|event| serde_json::from_str::<Value>(event).ok())
        .find(|message| message.get("id").and_then(Value::as_u64) == Some(id))
        .ok_or_else(|| AgentError::Registry(format!("no response for request {id} in event stream")))
}

#[async_trait]
impl CapabilityRegistry for McpClient {
    /// Perform the MCP handshake and remember the server-issued session id
    #[tracing::instrument(skip(self), fields(mcp.url = %self.endpoint))]
    async fn connect(&mut self) -> Result<()> {
        let params = json!({
            "protocolVersion": self.options.protocol_version,
            "capabilities": {},
            "clientInfo": {
                "name": self.options.client_name,
                "version": self.options.client_version
            }
        });

        let (reply, headers) = self.send_request("initialize", params).await?;
        let result = split_reply(reply, "initialize").map_err(|e| {
            AgentError::RegistryUnavailable(format!("initialize rejected (code {}): {}", e.code, e.message))
        })??;

        self.session_id = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.server_info = result
            .get("serverInfo")
            .and_then(|info| serde_json::from_value(info.clone()).ok());

        self.send_notification("notifications/initialized").await?;
        self.connected = true;

        tracing::info!(
            server = self.server_info.as_ref().map_or("unknown", |s| s.name.as_str()),
            session_id = self.session_id.as_deref().unwrap_or("none"),
            "MCP session initialized"
        );
        Ok(())
    }

    /// List every tool, following pagination cursors
    #[tracing::instrument(skip(self))]
    async fn discover(&self) -> Result<Vec<CapabilityDescriptor>> {
        if !self.connected {
            return Err(AgentError::Session("MCP client is not connected".into()));
        }

        let mut catalog = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map_or_else(|| json!({}), |c| json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;
            let page: ToolsPage = serde_json::from_value(result)
                .map_err(|e| AgentError::Parse(format!("tools/list: {e}")))?;

            catalog.extend(page.tools.into_iter().map(CapabilityDescriptor::from));

            match page.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_ref() != Some(&next) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(catalog)
    }

    #[tracing::instrument(
        skip(self, call),
        fields(tool.name = %call.name, mcp.session_id = self.session_id.as_deref().unwrap_or("none"))
    )]
    async fn invoke(&self, call: &ToolCall) -> Result<CapabilityResult> {
        if !self.connected {
            return Err(AgentError::Session("MCP client is not connected".into()));
        }

        let params = json!({
            "name": call.name,
            "arguments": call.arguments
        });

        let (reply, _) = self.send_request("tools/call", params).await?;
        let mut result = split_reply(reply, "tools/call").map_err(|e| {
            AgentError::ToolExecution(format!("'{}' failed (code {}): {}", call.name, e.code, e.message))
        })??;

        let is_error = result.get("isError").and_then(Value::as_bool).unwrap_or(false);
        let content = if result.get("content").is_some() {
            result["content"].take()
        } else {
            result
        };

        Ok(CapabilityResult::new(content).with_error(is_error))
    }

    /// Terminate the server-side session; a no-op when not connected
    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };

        let response = self
            .client
            .delete(&self.endpoint)
            .header(SESSION_HEADER, &session_id)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| AgentError::RegistryUnavailable(format!("{}: {e}", self.endpoint)))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            // Server does not support explicit termination, or already forgot us
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_FOUND => Ok(()),
            s => Err(AgentError::Registry(format!("closing session {session_id}: HTTP {s}"))),
        }
    }
}
