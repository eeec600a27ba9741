//! # readiness-core
//!
//! Platform-agnostic pre-session readiness check.
//!
//! Verifies that a candidate's camera, microphone and network are usable
//! before they enter a live session, then gates the handoff behind an
//! explicit agreement. Host backends (browser bridge, cpal, a desktop shell)
//! implement the `MediaDevices`, `ReachabilityProbe` and session traits and
//! plug into the generic `ReadinessEngine`.
//!
//! ## Architecture
//!
//! ```text
//! readiness-core (this crate)
//! ├── traits/       ← MediaDevices, MediaTrack, PreviewSink, ReachabilityProbe, ReadinessDelegate
//! ├── models/       ← ReadinessError, ReadinessState, ReadinessConfig, devices, network results
//! ├── processing/   ← RingBuffer, AudioTap, SpectrumAnalyser
//! ├── catalog/      ← DeviceCatalog (enumeration + selection policy)
//! ├── capture/      ← CaptureSessionManager (track lifecycle)
//! ├── monitor/      ← AnalysisGraph, AudioLevelMonitor
//! ├── network/      ← NetworkProber
//! └── readiness/    ← ReadinessEngine (orchestrator), ReadinessSnapshot
//! ```

pub mod capture;
pub mod catalog;
pub mod models;
pub mod monitor;
pub mod network;
pub mod processing;
pub mod readiness;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use capture::manager::{CaptureOutcome, CaptureSessionManager};
pub use catalog::resolver::DeviceCatalog;
pub use models::config::ReadinessConfig;
pub use models::device::{DeviceDescriptor, DeviceKind, DeviceNotice, DeviceSelection};
pub use models::error::ReadinessError;
pub use models::network::{ConnectionInfo, NetworkAssessment, NetworkProbeResult, QualityClass};
pub use models::state::{DeviceTest, PermissionStatus, ReadinessState, Stage};
pub use monitor::level::{AudioLevel, LevelClass};
pub use monitor::level_monitor::AudioLevelMonitor;
pub use network::prober::NetworkProber;
pub use processing::audio_tap::AudioTap;
pub use processing::ring_buffer::RingBuffer;
pub use processing::spectrum::SpectrumAnalyser;
pub use readiness::engine::{HostServices, ReadinessEngine};
pub use readiness::snapshot::ReadinessSnapshot;
pub use traits::media_devices::{CaptureConstraints, MediaDevices, MediaStream, MediaTrack, TrackRequest};
pub use traits::network::{NetworkInformation, ReachabilityProbe, StaticNetworkInformation};
pub use traits::preview::{NullPreview, PreviewSink};
pub use traits::readiness_delegate::ReadinessDelegate;
pub use traits::session::{SessionId, SessionLauncher, SessionMetadataProvider};
