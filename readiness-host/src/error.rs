use readiness_core::ReadinessError;

/// Failures inside the desktop backends, before they cross into the engine.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no input device matches {0:?}")]
    NoSuchDevice(String),

    #[error("no default input device")]
    NoDefaultDevice,

    #[error("device enumeration failed: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("input config unavailable: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format {0:?}")]
    SampleFormat(cpal::SampleFormat),

    #[error("capture thread: {0}")]
    Thread(String),

    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<HostError> for ReadinessError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::NoSuchDevice(_)
            | HostError::NoDefaultDevice
            | HostError::Build(cpal::BuildStreamError::DeviceNotAvailable)
            | HostError::Config(cpal::DefaultStreamConfigError::DeviceNotAvailable)
            | HostError::Play(cpal::PlayStreamError::DeviceNotAvailable) => ReadinessError::DeviceNotFound,
            HostError::Devices(e) => ReadinessError::EnumerationFailed(e.to_string()),
            HostError::Http(e) => ReadinessError::ProbeFailed(e.to_string()),
            other => {
                // Backends report denial as a generic OS error.
                let message = other.to_string();
                let lower = message.to_lowercase();
                if lower.contains("permission") || lower.contains("denied") {
                    ReadinessError::PermissionDenied
                } else {
                    ReadinessError::AcquisitionFailed(message)
                }
            }
        }
    }
}
