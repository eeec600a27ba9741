use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one timed reachability probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProbeResult {
    pub endpoint: String,
    /// Dispatch-to-settle time; `None` stands for an infinite latency (failed probe).
    pub latency_ms: Option<f64>,
    pub succeeded: bool,
}

impl NetworkProbeResult {
    pub fn success(endpoint: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            endpoint: endpoint.into(),
            latency_ms: Some(latency_ms),
            succeeded: true,
        }
    }

    pub fn failure(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            latency_ms: None,
            succeeded: false,
        }
    }
}

/// Ambient connection metadata, when the host exposes any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Effective connection class, e.g. "4g" or "wifi".
    pub effective_type: Option<String>,
    pub downlink_mbps: Option<f64>,
}

/// Coarse network quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityClass {
    Good,
    Poor,
    Unknown,
}

/// Network quality for one test cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAssessment {
    /// Mean over succeeding probes only; `None` when no probe succeeded.
    pub mean_latency_ms: Option<f64>,
    pub downlink_mbps: Option<f64>,
    pub connection_type: Option<String>,
    pub quality: QualityClass,
    pub attempted_probes: usize,
    pub succeeded_probes: usize,
    pub probes: Vec<NetworkProbeResult>,
    pub measured_at: Option<DateTime<Utc>>,
}

impl NetworkAssessment {
    /// Placeholder before any measurement has been taken.
    pub fn unmeasured() -> Self {
        Self {
            mean_latency_ms: None,
            downlink_mbps: None,
            connection_type: None,
            quality: QualityClass::Unknown,
            attempted_probes: 0,
            succeeded_probes: 0,
            probes: Vec::new(),
            measured_at: None,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.measured_at.is_some()
    }

    /// Every probe was attempted and none came back.
    pub fn is_unreachable(&self) -> bool {
        self.attempted_probes > 0 && self.succeeded_probes == 0
    }
}

impl Default for NetworkAssessment {
    fn default() -> Self {
        Self::unmeasured()
    }
}
