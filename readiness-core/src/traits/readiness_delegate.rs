use crate::models::device::DeviceNotice;
use crate::models::network::NetworkAssessment;
use crate::monitor::level::AudioLevel;
use crate::readiness::snapshot::ReadinessSnapshot;

/// Event delegate for readiness notifications.
///
/// Called from whichever task drives the engine (the level callback from the
/// sampling task). Implementations should marshal to the UI thread if needed.
pub trait ReadinessDelegate: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, snapshot: &ReadinessSnapshot);

    /// Called on every sampling tick while a microphone is attached.
    fn on_level_updated(&self, level: &AudioLevel);

    /// Called when a device could not be acquired.
    fn on_notice(&self, notice: &DeviceNotice);

    /// Called once per test cycle with the fresh network assessment.
    fn on_network_assessed(&self, assessment: &NetworkAssessment);
}
