use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::error::ReadinessError;

/// Opaque identifier of the live session the candidate is about to join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upstream source of the destination's display name (company, role...).
#[async_trait]
pub trait SessionMetadataProvider: Send + Sync {
    async fn destination_name(&self) -> Result<String, ReadinessError>;
}

/// Downstream handoff into the live session.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, session: &SessionId) -> Result<(), ReadinessError>;
}
