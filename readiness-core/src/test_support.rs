//! Scripted host fakes shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::models::device::{DeviceDescriptor, DeviceKind, DeviceNotice};
use crate::models::error::ReadinessError;
use crate::models::network::NetworkAssessment;
use crate::monitor::level::AudioLevel;
use crate::processing::audio_tap::AudioTap;
use crate::readiness::snapshot::ReadinessSnapshot;
use crate::traits::media_devices::{CaptureConstraints, MediaDevices, MediaStream, MediaTrack, TrackRequest};
use crate::traits::network::ReachabilityProbe;
use crate::traits::preview::PreviewSink;
use crate::traits::readiness_delegate::ReadinessDelegate;
use crate::traits::session::{SessionId, SessionLauncher, SessionMetadataProvider};

/// Deterministic pseudo-random samples in `[-amplitude, amplitude]`.
pub fn noise(len: usize, amplitude: f32) -> Vec<f32> {
    let mut state: u32 = 0x1234_5678;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let unit = (state >> 8) as f32 / (1u32 << 24) as f32;
            (unit * 2.0 - 1.0) * amplitude
        })
        .collect()
}

pub struct FakeTrack {
    id: String,
    kind: DeviceKind,
    stopped: AtomicBool,
    tap: Option<AudioTap>,
}

impl FakeTrack {
    pub fn new(id: &str, kind: DeviceKind) -> Arc<Self> {
        let tap = (kind == DeviceKind::Microphone).then(|| AudioTap::new(4096, 48000.0));
        Arc::new(Self {
            id: id.to_string(),
            kind,
            stopped: AtomicBool::new(false),
            tap,
        })
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn label(&self) -> String {
        format!("{} track", self.id)
    }

    fn is_live(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn audio_tap(&self) -> Option<AudioTap> {
        self.tap.clone()
    }
}

/// How the fake host answers a single-kind capture request.
#[derive(Debug, Clone)]
pub enum Behavior {
    Grant,
    Fail(ReadinessError),
    /// Wait for `FakeDevices::release_held`, then grant.
    Hold,
}

struct FakeDevicesState {
    devices: Vec<DeviceDescriptor>,
    permission_granted: bool,
    camera: Behavior,
    microphone: Behavior,
    enumerate_error: Option<ReadinessError>,
    opened: Vec<Arc<FakeTrack>>,
}

/// In-memory `MediaDevices`. Labels stay hidden until a capture succeeds.
pub struct FakeDevices {
    state: Mutex<FakeDevicesState>,
    gate: Semaphore,
}

impl FakeDevices {
    pub fn standard() -> Self {
        Self {
            state: Mutex::new(FakeDevicesState {
                devices: vec![
                    DeviceDescriptor::new("cam-1", "Front Camera", DeviceKind::Camera),
                    DeviceDescriptor::new("cam-2", "USB Camera", DeviceKind::Camera),
                    DeviceDescriptor::new("mic-1", "Built-in Microphone", DeviceKind::Microphone),
                    DeviceDescriptor::new("spk-1", "Built-in Speakers", DeviceKind::Speaker),
                ],
                permission_granted: false,
                camera: Behavior::Grant,
                microphone: Behavior::Grant,
                enumerate_error: None,
                opened: Vec::new(),
            }),
            gate: Semaphore::new(0),
        }
    }

    pub fn set_behavior(&self, kind: DeviceKind, behavior: Behavior) {
        let mut state = self.state.lock();
        match kind {
            DeviceKind::Camera => state.camera = behavior,
            _ => state.microphone = behavior,
        }
    }

    pub fn fail_enumeration(&self, error: ReadinessError) {
        self.state.lock().enumerate_error = Some(error);
    }

    /// Let `count` held acquisitions through.
    pub fn release_held(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub fn live_tracks(&self) -> usize {
        self.state.lock().opened.iter().filter(|t| t.is_live()).count()
    }

    pub fn opened_tracks(&self) -> usize {
        self.state.lock().opened.len()
    }

    fn behavior(&self, kind: DeviceKind) -> Behavior {
        let state = self.state.lock();
        match kind {
            DeviceKind::Camera => state.camera.clone(),
            _ => state.microphone.clone(),
        }
    }

    fn grant(&self, kind: DeviceKind, request: &TrackRequest) -> Result<Arc<FakeTrack>, ReadinessError> {
        let mut state = self.state.lock();
        let device = match request {
            TrackRequest::Exact(id) => state.devices.iter().find(|d| d.kind == kind && &d.id == id),
            TrackRequest::Any => state.devices.iter().find(|d| d.kind == kind),
        }
        .ok_or(ReadinessError::DeviceNotFound)?;
        let track = FakeTrack::new(&device.id, kind);
        state.permission_granted = true;
        state.opened.push(Arc::clone(&track));
        Ok(track)
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ReadinessError> {
        let state = self.state.lock();
        if let Some(ref e) = state.enumerate_error {
            return Err(e.clone());
        }
        Ok(state
            .devices
            .iter()
            .map(|d| {
                let label = if state.permission_granted { d.label.clone() } else { String::new() };
                DeviceDescriptor::new(d.id.clone(), label, d.kind)
            })
            .collect())
    }

    async fn open(&self, constraints: &CaptureConstraints) -> Result<MediaStream, ReadinessError> {
        if let (Some(video), Some(audio)) = (&constraints.video, &constraints.audio) {
            // Combined requests fail as a whole, like a browser prompt.
            for kind in [DeviceKind::Camera, DeviceKind::Microphone] {
                if let Behavior::Fail(e) = self.behavior(kind) {
                    return Err(e);
                }
            }
            let camera = self.grant(DeviceKind::Camera, video)?;
            let microphone = self.grant(DeviceKind::Microphone, audio)?;
            let tracks: Vec<Arc<dyn MediaTrack>> = vec![camera, microphone];
            return Ok(MediaStream::new(tracks));
        }

        let (kind, request) = match (&constraints.video, &constraints.audio) {
            (Some(video), None) => (DeviceKind::Camera, video),
            (None, Some(audio)) => (DeviceKind::Microphone, audio),
            _ => return Err(ReadinessError::AcquisitionFailed("empty constraints".into())),
        };
        match self.behavior(kind) {
            Behavior::Grant => {}
            Behavior::Fail(e) => return Err(e),
            Behavior::Hold => {
                let permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|e| ReadinessError::AcquisitionFailed(e.to_string()))?;
                permit.forget();
            }
        }
        let track = self.grant(kind, request)?;
        Ok(MediaStream::new(vec![track as Arc<dyn MediaTrack>]))
    }
}

#[derive(Debug, Clone)]
pub enum ProbeBehavior {
    Respond(Duration),
    Fail,
    Hang,
}

pub struct FakeProbe {
    behaviors: Vec<(String, ProbeBehavior)>,
}

impl FakeProbe {
    pub fn new(behaviors: Vec<(&str, ProbeBehavior)>) -> Self {
        Self {
            behaviors: behaviors
                .into_iter()
                .map(|(endpoint, behavior)| (endpoint.to_string(), behavior))
                .collect(),
        }
    }

    pub fn uniform(count: usize, behavior: ProbeBehavior) -> Self {
        Self {
            behaviors: (0..count)
                .map(|i| (format!("https://probe-{}.test", i), behavior.clone()))
                .collect(),
        }
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.behaviors.iter().map(|(e, _)| e.clone()).collect()
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn probe(&self, endpoint: &str) -> Result<(), ReadinessError> {
        let behavior = self
            .behaviors
            .iter()
            .find(|(e, _)| e == endpoint)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| ReadinessError::ProbeFailed(format!("unknown endpoint {}", endpoint)))?;
        match behavior {
            ProbeBehavior::Respond(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            ProbeBehavior::Fail => Err(ReadinessError::ProbeFailed("connection refused".into())),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct RecordingPreview {
    attached: Mutex<Option<String>>,
}

impl RecordingPreview {
    pub fn is_attached(&self) -> bool {
        self.attached.lock().is_some()
    }
}

impl PreviewSink for RecordingPreview {
    fn attach(&self, track: Arc<dyn MediaTrack>) {
        *self.attached.lock() = Some(track.id().to_string());
    }

    fn detach(&self) {
        *self.attached.lock() = None;
    }
}

#[derive(Default)]
pub struct RecordingDelegate {
    snapshots: Mutex<Vec<ReadinessSnapshot>>,
    levels: AtomicUsize,
    notices: Mutex<Vec<DeviceNotice>>,
    assessments: Mutex<Vec<NetworkAssessment>>,
}

impl RecordingDelegate {
    pub fn snapshots(&self) -> Vec<ReadinessSnapshot> {
        self.snapshots.lock().clone()
    }

    pub fn level_count(&self) -> usize {
        self.levels.load(Ordering::SeqCst)
    }

    pub fn notices(&self) -> Vec<DeviceNotice> {
        self.notices.lock().clone()
    }

    pub fn assessments(&self) -> Vec<NetworkAssessment> {
        self.assessments.lock().clone()
    }
}

impl ReadinessDelegate for RecordingDelegate {
    fn on_state_changed(&self, snapshot: &ReadinessSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }

    fn on_level_updated(&self, _level: &AudioLevel) {
        self.levels.fetch_add(1, Ordering::SeqCst);
    }

    fn on_notice(&self, notice: &DeviceNotice) {
        self.notices.lock().push(notice.clone());
    }

    fn on_network_assessed(&self, assessment: &NetworkAssessment) {
        self.assessments.lock().push(assessment.clone());
    }
}

pub struct FakeMetadata {
    result: Result<String, ReadinessError>,
    calls: AtomicUsize,
}

impl FakeMetadata {
    pub fn new(result: Result<String, ReadinessError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionMetadataProvider for FakeMetadata {
    async fn destination_name(&self) -> Result<String, ReadinessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Records launches. Optionally suspends in `launch` or fails the next call.
#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<SessionId>>,
    delay: Duration,
    next_error: Mutex<Option<ReadinessError>>,
}

impl RecordingLauncher {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn fail_next(&self, error: ReadinessError) {
        *self.next_error.lock() = Some(error);
    }

    pub fn launched(&self) -> Vec<SessionId> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl SessionLauncher for RecordingLauncher {
    async fn launch(&self, session: &SessionId) -> Result<(), ReadinessError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(e) = self.next_error.lock().take() {
            return Err(e);
        }
        self.launched.lock().push(session.clone());
        Ok(())
    }
}
