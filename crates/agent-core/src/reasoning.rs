//! Conversation Orchestrator
//!
//! Drives one exchange per user query: ask the model with the capability
//! catalog, walk its content blocks in order, resolve every invocation block
//! against the session, feed results back, and assemble the printable answer.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::conversation::{Conversation, Turn};
use crate::error::{AgentError, Result};
use crate::provider::{ContentBlock, GenerationOptions, LlmProvider, ModelResponse};
use crate::session::Session;
use crate::tool::{CapabilityDescriptor, CapabilityRegistry, CapabilityResult, ToolCall};

/// How invocation blocks within one response are resolved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvocationPolicy {
    /// One follow-up model call after every invocation
    #[default]
    Interleaved,
    /// Resolve every invocation first, then a single follow-up call
    Batched,
}

impl FromStr for InvocationPolicy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interleaved" => Ok(Self::Interleaved),
            "batched" => Ok(Self::Batched),
            other => Err(AgentError::Config(format!(
                "unknown invocation policy '{other}' (expected 'interleaved' or 'batched')"
            ))),
        }
    }
}

/// Which conversation a query is answered in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversationScope {
    /// Every query starts a fresh conversation
    #[default]
    Query,
    /// Queries extend a conversation kept across the session
    Session,
}

impl FromStr for ConversationScope {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Self::Query),
            "session" => Ok(Self::Session),
            other => Err(AgentError::Config(format!(
                "unknown conversation scope '{other}' (expected 'query' or 'session')"
            ))),
        }
    }
}

/// Agent configuration
#[derive(Clone, Debug, Default)]
pub struct AgentConfig {
    /// Generation options
    pub generation: GenerationOptions,

    pub invocation_policy: InvocationPolicy,

    pub scope: ConversationScope,

    /// Upper bound for each model or capability call; unbounded when unset
    pub call_timeout: Option<Duration>,
}

/// The main Agent struct
pub struct Agent<R: CapabilityRegistry> {
    provider: Arc<dyn LlmProvider>,
    session: Session<R>,
    config: AgentConfig,
}

impl<R: CapabilityRegistry> Agent<R> {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, session: Session<R>, config: AgentConfig) -> Self {
        Self {
            provider,
            session,
            config,
        }
    }

    /// Answer a query in a brand-new conversation
    pub async fn process_query(&self, query: &str) -> Result<String> {
        let mut conversation = Conversation::new();
        self.exchange(&mut conversation, query).await
    }

    /// Answer a query as a continuation of `conversation`.
    ///
    /// On success the conversation gains the query, every capability result
    /// and the final answer. On failure it is left exactly as it was.
    pub async fn process_in(&self, conversation: &mut Conversation, query: &str) -> Result<String> {
        let mut working = conversation.clone();
        let answer = self.exchange(&mut working, query).await?;
        if !answer.is_empty() {
            working.push(Turn::assistant(answer.clone()));
        }
        *conversation = working;
        Ok(answer)
    }

    /// Answer a query according to the configured conversation scope
    pub async fn respond(&self, history: &mut Conversation, query: &str) -> Result<String> {
        match self.config.scope {
            ConversationScope::Query => self.process_query(query).await,
            ConversationScope::Session => self.process_in(history, query).await,
        }
    }

    #[tracing::instrument(
        skip(self, conversation, query),
        fields(session.id = %self.session.id(), policy = ?self.config.invocation_policy)
    )]
    async fn exchange(&self, conversation: &mut Conversation, query: &str) -> Result<String> {
        conversation.push(Turn::user(query));

        let response = self.generate(conversation, Some(self.session.catalog())).await?;
        tracing::debug!(
            blocks = response.blocks.len(),
            invocations = response.invocation_count(),
            "Initial response"
        );

        let mut output = Vec::new();
        let mut unanswered = 0usize;

        for block in response.blocks {
            match block {
                ContentBlock::Text { text } => output.push(text),
                ContentBlock::ToolUse(call) => {
                    let result = self.invoke(&call).await?;
                    output.push(call.describe());
                    conversation.push(Turn::capability_result(result));

                    match self.config.invocation_policy {
                        InvocationPolicy::Interleaved => {
                            output.extend(self.follow_up(conversation).await?);
                        }
                        InvocationPolicy::Batched => unanswered += 1,
                    }
                }
            }
        }

        if unanswered > 0 {
            output.extend(self.follow_up(conversation).await?);
        }

        Ok(output.join("\n"))
    }

    /// Model call without the catalog; only its text is kept.
    async fn follow_up(&self, conversation: &Conversation) -> Result<Vec<String>> {
        let response = self.generate(conversation, None).await?;

        let ignored = response.invocation_count();
        if ignored > 0 {
            tracing::warn!(ignored, "Follow-up response requested tools; ignoring them");
        }

        Ok(response.text_blocks().map(str::to_owned).collect())
    }

    async fn generate(
        &self,
        conversation: &Conversation,
        catalog: Option<&[CapabilityDescriptor]>,
    ) -> Result<ModelResponse> {
        tracing::debug!(
            provider = self.provider.name(),
            turns = conversation.len(),
            with_tools = catalog.is_some(),
            "Calling model"
        );
        self.bounded(
            "model call",
            self.provider.generate(conversation, catalog, &self.config.generation),
        )
        .await
    }

    async fn invoke(&self, call: &ToolCall) -> Result<CapabilityResult> {
        let descriptor = self
            .session
            .descriptor(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;
        descriptor.validate(&call.arguments)?;

        tracing::debug!(tool = %call.name, "Executing tool");
        let result = self.bounded("tool call", self.session.invoke(call)).await?;

        if result.is_error {
            tracing::warn!(tool = %call.name, "Tool reported an error result");
        }
        Ok(result)
    }

    async fn bounded<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.call_timeout {
            None => call.await,
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| AgentError::Timeout {
                operation: operation.into(),
                seconds: limit.as_secs(),
            })?,
        }
    }

    /// Get the session
    pub const fn session(&self) -> &Session<R> {
        &self.session
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Close the session, consuming the agent
    pub async fn shutdown(self) -> Result<()> {
        self.session.close().await
    }
}
