//! Session Management
//!
//! A session owns the live capability registry connection and the catalog
//! discovered when it was opened. The catalog never changes afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::tool::{ensure_unique_names, CapabilityDescriptor, CapabilityRegistry, CapabilityResult, ToolCall};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live registry connection plus its cached catalog
pub struct Session<R: CapabilityRegistry> {
    id: SessionId,
    registry: R,
    catalog: Vec<CapabilityDescriptor>,
    created_at: DateTime<Utc>,
}

impl<R: CapabilityRegistry> Session<R> {
    /// Connect and discover the catalog.
    ///
    /// If any step fails the registry is closed before the error is returned.
    pub async fn open(mut registry: R) -> Result<Self> {
        let catalog = match Self::handshake(&mut registry).await {
            Ok(catalog) => catalog,
            Err(e) => {
                if let Err(close_err) = registry.close().await {
                    tracing::warn!(error = %close_err, "Failed to close registry after failed open");
                }
                return Err(e);
            }
        };

        let session = Self {
            id: SessionId::new(),
            registry,
            catalog,
            created_at: Utc::now(),
        };

        tracing::info!(
            session.id = %session.id,
            tools = session.catalog.len(),
            "Session opened"
        );

        Ok(session)
    }

    async fn handshake(registry: &mut R) -> Result<Vec<CapabilityDescriptor>> {
        registry.connect().await?;
        let catalog = registry.discover().await?;
        ensure_unique_names(&catalog)?;
        Ok(catalog)
    }

    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Capabilities advertised at connection time
    pub fn catalog(&self) -> &[CapabilityDescriptor] {
        &self.catalog
    }

    pub fn descriptor(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.catalog.iter().find(|d| d.name == name)
    }

    /// Capability names in catalog order
    pub fn tool_names(&self) -> Vec<&str> {
        self.catalog.iter().map(|d| d.name.as_str()).collect()
    }

    pub async fn invoke(&self, call: &ToolCall) -> Result<CapabilityResult> {
        self.registry.invoke(call).await
    }

    /// Close the registry connection, consuming the session
    pub async fn close(mut self) -> Result<()> {
        let lifetime = Utc::now() - self.created_at;
        tracing::info!(
            session.id = %self.id,
            seconds = lifetime.num_seconds(),
            "Closing session"
        );
        self.registry.close().await
    }
}
