use serde::Serialize;

use crate::models::device::{DeviceDescriptor, DeviceNotice, DeviceSelection};
use crate::models::network::NetworkAssessment;
use crate::models::state::ReadinessState;
use crate::monitor::level::AudioLevel;

/// Everything the host UI renders for the readiness check.
///
/// Serializable for JSON export to a web or desktop frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessSnapshot {
    pub state: ReadinessState,
    pub progress: u8,
    pub devices: Vec<DeviceDescriptor>,
    pub selection: DeviceSelection,
    pub audio_level: Option<AudioLevel>,
    pub network: NetworkAssessment,
    pub notices: Vec<DeviceNotice>,
    /// Set when `complete_test` was refused; cleared by the next successful transition.
    pub blocking_message: Option<String>,
    pub destination_name: String,
}

impl ReadinessSnapshot {
    /// Whether the candidate may enter the live session. Agrees with the
    /// guard on `ReadinessEngine::accept_and_proceed`.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }
}
