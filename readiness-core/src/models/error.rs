use thiserror::Error;

use super::state::PermissionStatus;

/// Errors surfaced by the readiness engine.
///
/// Acquisition errors (`PermissionDenied`, `DeviceNotFound`,
/// `AcquisitionFailed`) are caught per device kind and turned into a status
/// marker plus a notice; none of them abort the check. `ProbeFailed` and
/// `NoSignal` never reach a caller of the network prober.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not found")]
    DeviceNotFound,

    #[error("acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("no network signal")]
    NoSignal,

    #[error("device enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("devices not ready (camera {camera}, microphone {microphone})")]
    DevicesNotReady {
        camera: PermissionStatus,
        microphone: PermissionStatus,
    },

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("session metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("session launch failed: {0}")]
    LaunchFailed(String),
}

impl ReadinessError {
    /// Whether this error came out of a device acquisition attempt.
    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::DeviceNotFound | Self::AcquisitionFailed(_)
        )
    }
}
