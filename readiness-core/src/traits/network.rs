use async_trait::async_trait;

use crate::models::error::ReadinessError;
use crate::models::network::ConnectionInfo;

/// Lightweight, no-cache reachability check against one URL.
///
/// Resolves once the request settles; an `Err` counts as a failed probe.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, endpoint: &str) -> Result<(), ReadinessError>;
}

/// Ambient network metadata exposed by the host, if any.
pub trait NetworkInformation: Send + Sync {
    fn connection_info(&self) -> Option<ConnectionInfo>;
}

/// Fixed metadata, or none at all for hosts that expose nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticNetworkInformation(pub Option<ConnectionInfo>);

impl NetworkInformation for StaticNetworkInformation {
    fn connection_info(&self) -> Option<ConnectionInfo> {
        self.0.clone()
    }
}
