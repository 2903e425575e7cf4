//! # agent-core
//!
//! Conversation orchestration between a language model and a remote
//! capability (tool) registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────────┐  ┌─────────────────┐  │
//! │  │ Orchestrator│  │    Session      │  │   LlmProvider   │  │
//! │  │    Loop     │──│ (Capability     │──│ (Model Gateway) │  │
//! │  │             │  │   Registry)     │  │                 │  │
//! │  └─────────────┘  └─────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` and `CapabilityRegistry` traits are the only seams to
//! the outside world; the orchestrator never talks HTTP itself.

pub mod conversation;
pub mod error;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use conversation::{Conversation, Role, Turn, TurnContent};
pub use error::{AgentError, Result};
pub use provider::{ContentBlock, GenerationOptions, LlmProvider, ModelResponse};
pub use reasoning::{Agent, AgentConfig, ConversationScope, InvocationPolicy};
pub use session::Session;
pub use tool::{CapabilityDescriptor, CapabilityRegistry, CapabilityResult, ToolCall};
