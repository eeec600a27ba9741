use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::manager::CaptureSessionManager;
use crate::catalog::resolver::DeviceCatalog;
use crate::models::config::ReadinessConfig;
use crate::models::device::{DeviceDescriptor, DeviceKind, DeviceNotice};
use crate::models::error::ReadinessError;
use crate::models::network::NetworkAssessment;
use crate::models::state::{DeviceTest, PermissionStatus, ReadinessState};
use crate::network::prober::NetworkProber;
use crate::readiness::snapshot::ReadinessSnapshot;
use crate::traits::media_devices::MediaDevices;
use crate::traits::network::{NetworkInformation, ReachabilityProbe};
use crate::traits::preview::PreviewSink;
use crate::traits::readiness_delegate::ReadinessDelegate;
use crate::traits::session::{SessionId, SessionLauncher, SessionMetadataProvider};

/// Host-provided capabilities the engine is wired to.
#[derive(Clone)]
pub struct HostServices {
    pub devices: Arc<dyn MediaDevices>,
    pub preview: Arc<dyn PreviewSink>,
    pub probe: Arc<dyn ReachabilityProbe>,
    pub network_info: Arc<dyn NetworkInformation>,
    pub metadata: Arc<dyn SessionMetadataProvider>,
    pub launcher: Arc<dyn SessionLauncher>,
}

/// Session handoff progress. `Launching` is reserved before the launcher
/// is awaited so concurrent callers cannot both get through.
#[derive(Debug)]
enum Handoff {
    Idle,
    Launching(SessionId),
    Launched(SessionId),
}

struct EngineState {
    state: ReadinessState,
    network: NetworkAssessment,
    notices: Vec<DeviceNotice>,
    blocking_message: Option<String>,
    destination_name: Option<String>,
    handoff: Handoff,
}

/// Pre-session readiness orchestrator.
///
/// Owns the state machine and drives one test cycle at a time: permission
/// refresh, concurrent device acquisition, then the network probe. Each
/// `start_test`/`retest`/`teardown` advances a cycle counter; a cycle that
/// finds itself superseded after an await drops its results instead of
/// writing them back, so a retest can never inherit stale markers.
///
/// Locks are never held across an await point.
pub struct ReadinessEngine {
    config: ReadinessConfig,
    catalog: DeviceCatalog,
    capture: CaptureSessionManager,
    prober: NetworkProber,
    metadata: Arc<dyn SessionMetadataProvider>,
    launcher: Arc<dyn SessionLauncher>,
    delegate: Option<Arc<dyn ReadinessDelegate>>,
    inner: Mutex<EngineState>,
    cycle: AtomicU64,
}

impl ReadinessEngine {
    pub fn new(config: ReadinessConfig, host: HostServices) -> Result<Self, ReadinessError> {
        config.validate().map_err(ReadinessError::ConfigurationFailed)?;

        Ok(Self {
            catalog: DeviceCatalog::new(Arc::clone(&host.devices)),
            capture: CaptureSessionManager::new(host.devices, host.preview, &config),
            prober: NetworkProber::new(host.probe, host.network_info, &config),
            metadata: host.metadata,
            launcher: host.launcher,
            delegate: None,
            inner: Mutex::new(EngineState {
                state: ReadinessState::default(),
                network: NetworkAssessment::unmeasured(),
                notices: Vec::new(),
                blocking_message: None,
                destination_name: None,
                handoff: Handoff::Idle,
            }),
            cycle: AtomicU64::new(0),
            config,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn ReadinessDelegate>) {
        self.capture.set_delegate(Arc::clone(&delegate));
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Initial enumeration plus the one-time destination name lookup.
    pub async fn mount(&self) -> ReadinessSnapshot {
        self.catalog.enumerate().await;
        self.load_destination_name().await;
        self.emit();
        self.snapshot()
    }

    async fn load_destination_name(&self) {
        if self.inner.lock().destination_name.is_some() {
            return;
        }
        let name = match self.metadata.destination_name().await {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => self.config.fallback_destination_name.clone(),
            Err(e) => {
                let err = match e {
                    ReadinessError::MetadataUnavailable(_) => e,
                    other => ReadinessError::MetadataUnavailable(other.to_string()),
                };
                log::warn!("{}; using fallback name", err);
                self.config.fallback_destination_name.clone()
            }
        };
        self.inner.lock().destination_name = Some(name);
    }

    /// Run one device test cycle.
    ///
    /// Returns once the network assessment has landed, or early with the
    /// current snapshot when a newer cycle superseded this one.
    pub async fn start_test(&self) -> Result<ReadinessSnapshot, ReadinessError> {
        let cycle = {
            let mut inner = self.inner.lock();
            inner.state = inner.state.begin_test()?;
            inner.network = NetworkAssessment::unmeasured();
            inner.notices.clear();
            inner.blocking_message = None;
            self.cycle.fetch_add(1, Ordering::SeqCst) + 1
        };
        log::info!("Device test started (cycle {})", cycle);
        self.emit();

        self.catalog.refresh_with_permission().await;
        if !self.is_current(cycle) {
            return Ok(self.snapshot());
        }

        let selection = self.catalog.selection();
        let outcome = self
            .capture
            .start(
                selection.get(DeviceKind::Camera),
                selection.get(DeviceKind::Microphone),
            )
            .await;

        if outcome.cancelled {
            log::info!("Cycle {} acquisition cancelled by a capture stop; skipping network check", cycle);
            return Ok(self.snapshot());
        }

        let recorded = {
            let mut inner = self.inner.lock();
            if self.is_current(cycle) && inner.state.device_test() == DeviceTest::Testing {
                inner.state = inner
                    .state
                    .record_device(DeviceKind::Camera, outcome.camera)?
                    .record_device(DeviceKind::Microphone, outcome.microphone)?;
                inner.notices = outcome.notices.clone();
                true
            } else {
                false
            }
        };
        if !recorded {
            log::debug!("Cycle {} superseded during acquisition", cycle);
            return Ok(self.snapshot());
        }
        log::info!(
            "Device test: camera {}, microphone {}",
            outcome.camera,
            outcome.microphone
        );
        if let Some(ref d) = self.delegate {
            for notice in &outcome.notices {
                d.on_notice(notice);
            }
        }
        self.emit();

        let assessment = self.prober.run().await;
        let stored = {
            let mut inner = self.inner.lock();
            if self.is_current(cycle) {
                inner.network = assessment.clone();
                true
            } else {
                false
            }
        };
        if stored {
            if let Some(ref d) = self.delegate {
                d.on_network_assessed(&assessment);
            }
            self.emit();
        }
        Ok(self.snapshot())
    }

    /// Stop capture and try to mark the test complete.
    ///
    /// Capture is released whatever the outcome. A refusal leaves the test
    /// in `Testing` and sets the blocking message.
    pub async fn complete_test(&self) -> Result<ReadinessSnapshot, ReadinessError> {
        self.capture.stop();

        let result = {
            let mut inner = self.inner.lock();
            match inner.state.complete_test() {
                Ok(next) => {
                    inner.state = next;
                    inner.blocking_message = None;
                    Ok(())
                }
                Err(ReadinessError::DevicesNotReady { camera, microphone }) => {
                    inner.blocking_message = Some(blocking_message(camera, microphone));
                    Err(ReadinessError::DevicesNotReady { camera, microphone })
                }
                Err(e) => Err(e),
            }
        };
        match result {
            Ok(()) => log::info!("Device test complete"),
            Err(ref e) => log::warn!("Device test not complete: {}", e),
        }
        self.emit();
        result.map(|_| self.snapshot())
    }

    /// Reset every marker, release capture, then start a fresh cycle.
    pub async fn retest(&self) -> Result<ReadinessSnapshot, ReadinessError> {
        {
            let mut inner = self.inner.lock();
            inner.state = inner.state.reset()?;
            inner.network = NetworkAssessment::unmeasured();
            inner.notices.clear();
            inner.blocking_message = None;
            self.cycle.fetch_add(1, Ordering::SeqCst);
        }
        self.capture.stop();
        log::info!("Device test reset");
        self.emit();
        self.start_test().await
    }

    pub fn advance(&self) -> Result<ReadinessSnapshot, ReadinessError> {
        self.transition("advance", |s| s.advance())
    }

    pub fn back(&self) -> Result<ReadinessSnapshot, ReadinessError> {
        self.transition("back", |s| s.back())
    }

    pub fn set_agreement(&self, accepted: bool) -> Result<ReadinessSnapshot, ReadinessError> {
        self.transition("set_agreement", |s| s.set_agreement(accepted))
    }

    /// Hand the candidate over to the live session. Launches at most once;
    /// a failed launch frees the handoff for another attempt.
    pub async fn accept_and_proceed(&self, session: &SessionId) -> Result<(), ReadinessError> {
        {
            let mut inner = self.inner.lock();
            inner.state.ensure_ready_to_proceed()?;
            if let Handoff::Launching(ref other) | Handoff::Launched(ref other) = inner.handoff {
                return Err(ReadinessError::InvalidTransition(format!(
                    "session {} already handed off",
                    other
                )));
            }
            inner.handoff = Handoff::Launching(session.clone());
        }
        self.capture.stop();

        let result = self.launcher.launch(session).await.map_err(|e| match e {
            ReadinessError::LaunchFailed(_) => e,
            other => ReadinessError::LaunchFailed(other.to_string()),
        });

        let mut inner = self.inner.lock();
        match result {
            Ok(()) => {
                inner.handoff = Handoff::Launched(session.clone());
                log::info!("Launched session {}", session);
                Ok(())
            }
            Err(e) => {
                inner.handoff = Handoff::Idle;
                log::error!("Session {} failed to launch: {}", session, e);
                Err(e)
            }
        }
    }

    /// Record an explicit device choice. Takes effect on the next test cycle.
    pub fn select_device(&self, kind: DeviceKind, id: &str) -> Result<(), ReadinessError> {
        self.catalog.select(kind, id)?;
        self.emit();
        Ok(())
    }

    /// Re-enumerate after a device was plugged in or removed.
    pub async fn refresh_devices(&self) -> Vec<DeviceDescriptor> {
        let devices = self.catalog.enumerate().await;
        self.emit();
        devices
    }

    /// Abandon any in-flight cycle and release capture. Also runs on drop.
    pub fn teardown(&self) {
        self.cycle.fetch_add(1, Ordering::SeqCst);
        self.capture.stop();
        log::debug!("Readiness engine torn down");
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        let devices = self.catalog.devices();
        let selection = self.catalog.selection();
        let audio_level = self.capture.monitor().current_level();

        let inner = self.inner.lock();
        ReadinessSnapshot {
            state: inner.state,
            progress: inner.state.progress(),
            devices,
            selection,
            audio_level,
            network: inner.network.clone(),
            notices: inner.notices.clone(),
            blocking_message: inner.blocking_message.clone(),
            destination_name: inner
                .destination_name
                .clone()
                .unwrap_or_else(|| self.config.fallback_destination_name.clone()),
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.inner.lock().state
    }

    pub fn progress(&self) -> u8 {
        self.inner.lock().state.progress()
    }

    pub fn destination_name(&self) -> String {
        self.inner
            .lock()
            .destination_name
            .clone()
            .unwrap_or_else(|| self.config.fallback_destination_name.clone())
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_active()
    }

    fn transition<F>(&self, name: &str, f: F) -> Result<ReadinessSnapshot, ReadinessError>
    where
        F: FnOnce(ReadinessState) -> Result<ReadinessState, ReadinessError>,
    {
        {
            let mut inner = self.inner.lock();
            let next = f(inner.state)?;
            log::info!(
                "{}: {:?} -> {:?} (progress {})",
                name,
                inner.state.stage(),
                next.stage(),
                next.progress()
            );
            inner.state = next;
            inner.blocking_message = None;
        }
        self.emit();
        Ok(self.snapshot())
    }

    fn is_current(&self, cycle: u64) -> bool {
        self.cycle.load(Ordering::SeqCst) == cycle
    }

    fn emit(&self) {
        if let Some(ref d) = self.delegate {
            d.on_state_changed(&self.snapshot());
        }
    }
}

impl Drop for ReadinessEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn blocking_message(camera: PermissionStatus, microphone: PermissionStatus) -> String {
    let missing: Vec<&str> = [("camera", camera), ("microphone", microphone)]
        .iter()
        .filter(|(_, status)| !status.is_granted())
        .map(|(name, _)| *name)
        .collect();
    format!(
        "Camera and microphone access are both required to continue. Allow {} access and retest.",
        missing.join(" and ")
    )
}
