use async_trait::async_trait;

use readiness_core::{ReadinessError, SessionId, SessionLauncher, SessionMetadataProvider};

/// Destination name supplied up front, e.g. from the command line.
pub struct StaticMetadata {
    name: Option<String>,
}

impl StaticMetadata {
    pub fn new(name: Option<String>) -> Self {
        Self { name }
    }
}

#[async_trait]
impl SessionMetadataProvider for StaticMetadata {
    async fn destination_name(&self) -> Result<String, ReadinessError> {
        self.name
            .clone()
            .ok_or_else(|| ReadinessError::MetadataUnavailable("no destination configured".into()))
    }
}

/// Launcher for hosts without a session runtime: records the handoff in the log.
pub struct LoggingLauncher;

#[async_trait]
impl SessionLauncher for LoggingLauncher {
    async fn launch(&self, session: &SessionId) -> Result<(), ReadinessError> {
        log::info!("Handing off to session {}", session);
        Ok(())
    }
}
