use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::config::ReadinessConfig;
use crate::models::device::{DeviceKind, DeviceNotice};
use crate::models::error::ReadinessError;
use crate::models::state::PermissionStatus;
use crate::monitor::level_monitor::AudioLevelMonitor;
use crate::traits::media_devices::{CaptureConstraints, MediaDevices, MediaTrack};
use crate::traits::preview::PreviewSink;
use crate::traits::readiness_delegate::ReadinessDelegate;

/// The set of tracks currently held for a device test.
///
/// At most one video and one audio track exist at a time; the record is
/// owned by `CaptureSessionManager` and only handles leave it.
#[derive(Default)]
pub struct CaptureSession {
    id: Option<Uuid>,
    video: Option<Arc<dyn MediaTrack>>,
    audio: Option<Arc<dyn MediaTrack>>,
}

impl CaptureSession {
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    fn slot(&mut self, kind: DeviceKind) -> &mut Option<Arc<dyn MediaTrack>> {
        match kind {
            DeviceKind::Camera => &mut self.video,
            _ => &mut self.audio,
        }
    }

    /// Stop every held track. Returns how many were released.
    fn release(&mut self) -> usize {
        let mut released = 0;
        for track in [self.video.take(), self.audio.take()].into_iter().flatten() {
            track.stop();
            released += 1;
        }
        self.id = None;
        released
    }
}

/// Per-kind result of `CaptureSessionManager::start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub camera: PermissionStatus,
    pub microphone: PermissionStatus,
    pub notices: Vec<DeviceNotice>,
    /// `stop()` ran while this start was pending; whatever landed was released.
    pub cancelled: bool,
}

enum Acquisition {
    Installed,
    Failed(ReadinessError),
    Cancelled,
}

/// Capture session manager.
///
/// Acquires camera and microphone as two independent, concurrent requests
/// and owns the resulting tracks until `stop()`. Every `stop()` advances an
/// epoch; an acquisition that lands after its epoch has passed is released
/// on the spot instead of being installed.
pub struct CaptureSessionManager {
    devices: Arc<dyn MediaDevices>,
    preview: Arc<dyn PreviewSink>,
    monitor: AudioLevelMonitor,
    session: Mutex<CaptureSession>,
    epoch: AtomicU64,
}

impl CaptureSessionManager {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        preview: Arc<dyn PreviewSink>,
        config: &ReadinessConfig,
    ) -> Self {
        Self {
            devices,
            preview,
            monitor: AudioLevelMonitor::new(config),
            session: Mutex::new(CaptureSession::default()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn ReadinessDelegate>) {
        self.monitor.set_delegate(delegate);
    }

    pub fn monitor(&self) -> &AudioLevelMonitor {
        &self.monitor
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.lock().id()
    }

    pub fn has_video(&self) -> bool {
        self.session.lock().has_video()
    }

    pub fn has_audio(&self) -> bool {
        self.session.lock().has_audio()
    }

    /// Acquire camera and microphone.
    ///
    /// Any prior session is released first. A failure on one device never
    /// blocks or aborts the other.
    pub async fn start(&self, camera_id: Option<&str>, microphone_id: Option<&str>) -> CaptureOutcome {
        self.stop();
        let epoch = self.epoch.load(Ordering::SeqCst);
        {
            let mut session = self.session.lock();
            session.id = Some(Uuid::new_v4());
        }

        let (camera, microphone) = futures::join!(
            self.acquire(DeviceKind::Camera, camera_id, epoch),
            self.acquire(DeviceKind::Microphone, microphone_id, epoch),
        );

        let mut outcome = CaptureOutcome {
            camera: PermissionStatus::Pending,
            microphone: PermissionStatus::Pending,
            notices: Vec::new(),
            cancelled: false,
        };
        for (kind, acquisition) in [(DeviceKind::Camera, camera), (DeviceKind::Microphone, microphone)] {
            let status = match acquisition {
                Acquisition::Installed => PermissionStatus::Granted,
                Acquisition::Failed(e) => {
                    let notice = DeviceNotice::from_error(kind, e);
                    log::warn!("{} unavailable: {}", kind, notice.error);
                    outcome.notices.push(notice);
                    PermissionStatus::Denied
                }
                Acquisition::Cancelled => {
                    outcome.cancelled = true;
                    PermissionStatus::Pending
                }
            };
            match kind {
                DeviceKind::Camera => outcome.camera = status,
                _ => outcome.microphone = status,
            }
        }
        outcome
    }

    /// Release every track, detach the preview and tear down the analysis
    /// graph. Safe to call any number of times.
    pub fn stop(&self) {
        let mut taken = {
            let mut session = self.session.lock();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            self.monitor.detach();
            self.preview.detach();
            std::mem::take(&mut *session)
        };

        // Tracks are stopped after the lock is released.
        let released = taken.release();
        if released > 0 {
            log::info!("Capture stopped, {} track(s) released", released);
        }
    }

    async fn acquire(&self, kind: DeviceKind, device_id: Option<&str>, epoch: u64) -> Acquisition {
        let constraints = match kind {
            DeviceKind::Camera => CaptureConstraints::camera(device_id),
            _ => CaptureConstraints::microphone(device_id),
        };

        let mut stream = match self.devices.open(&constraints).await {
            Ok(stream) => stream,
            Err(e) if self.epoch.load(Ordering::SeqCst) != epoch => {
                log::debug!("{} acquisition failed after cancel: {}", kind, e);
                return Acquisition::Cancelled;
            }
            Err(e) => return Acquisition::Failed(e),
        };
        let track = stream.take_track(kind);
        stream.stop_all();
        let Some(track) = track else {
            return Acquisition::Failed(ReadinessError::DeviceNotFound);
        };

        // Installing and wiring happen under the session lock so a concurrent
        // `stop()` either sees the track or cancels it before it lands.
        let mut session = self.session.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            drop(session);
            track.stop();
            log::warn!("{} landed after capture stop; released", kind);
            return Acquisition::Cancelled;
        }
        if let Some(previous) = session.slot(kind).replace(Arc::clone(&track)) {
            previous.stop();
        }
        match kind {
            DeviceKind::Camera => self.preview.attach(track),
            _ => {
                if let Err(e) = self.monitor.attach(track) {
                    log::warn!("Microphone granted but not metered: {}", e);
                }
            }
        }
        drop(session);

        log::info!("{} acquired", kind);
        Acquisition::Installed
    }

    /// Whether any track is currently held.
    pub fn is_active(&self) -> bool {
        !self.session.lock().is_empty()
    }
}

impl Drop for CaptureSessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}
