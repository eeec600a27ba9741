use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::config::ReadinessConfig;
use crate::models::error::ReadinessError;
use crate::monitor::graph::AnalysisGraph;
use crate::monitor::level::AudioLevel;
use crate::traits::media_devices::MediaTrack;
use crate::traits::readiness_delegate::ReadinessDelegate;

/// Shared between the monitor and its sampling task.
struct MonitorState {
    graph: Option<AnalysisGraph>,
    level: Option<AudioLevel>,
}

/// Audio level monitor.
///
/// `attach` connects an analysis graph to a microphone track and spawns a
/// self-rescheduling sampling task on the current tokio runtime; `detach`
/// cancels it through its `CancellationToken` and drops the graph. The
/// monitor never acquires a track itself.
pub struct AudioLevelMonitor {
    fft_size: usize,
    smoothing: f32,
    quiet_threshold: f32,
    interval: Duration,
    state: Arc<Mutex<MonitorState>>,
    cancel: Mutex<Option<CancellationToken>>,
    delegate: Option<Arc<dyn ReadinessDelegate>>,
}

impl AudioLevelMonitor {
    pub fn new(config: &ReadinessConfig) -> Self {
        Self {
            fft_size: config.fft_size,
            smoothing: config.smoothing,
            quiet_threshold: config.quiet_threshold,
            interval: config.sample_interval(),
            state: Arc::new(Mutex::new(MonitorState {
                graph: None,
                level: None,
            })),
            cancel: Mutex::new(None),
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn ReadinessDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Build the analysis graph over `track` and start the sampling loop.
    ///
    /// Any previous attachment is detached first. Returns the token that
    /// cancels the loop.
    pub fn attach(&self, track: Arc<dyn MediaTrack>) -> Result<CancellationToken, ReadinessError> {
        self.detach();

        let track_id = track.id().to_string();
        let graph = AnalysisGraph::connect(track, self.fft_size, self.smoothing)?;
        self.state.lock().graph = Some(graph);

        let token = CancellationToken::new();
        tokio::spawn(Self::sample_loop(
            Arc::clone(&self.state),
            token.clone(),
            self.interval,
            self.quiet_threshold,
            self.delegate.clone(),
        ));
        *self.cancel.lock() = Some(token.clone());

        log::info!("Level monitor attached to {}", track_id);
        Ok(token)
    }

    /// Cancel the pending tick and disconnect the graph. Idempotent.
    pub fn detach(&self) {
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
            log::debug!("Level monitor sampling cancelled");
        }
        let mut state = self.state.lock();
        state.graph = None;
        state.level = None;
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().graph.is_some()
    }

    /// Last published reading, if attached.
    pub fn current_level(&self) -> Option<AudioLevel> {
        self.state.lock().level
    }

    /// Run one sampling tick immediately.
    pub fn sample_now(&self) -> Option<AudioLevel> {
        Self::tick(&self.state, self.quiet_threshold)
    }

    fn tick(state: &Mutex<MonitorState>, quiet_threshold: f32) -> Option<AudioLevel> {
        let mut state = state.lock();
        let graph = state.graph.as_mut()?;
        if !graph.is_live() {
            return None;
        }
        let level = AudioLevel::new(graph.sample(), quiet_threshold);
        state.level = Some(level);
        Some(level)
    }

    /// Periodic sampling task. Exits on cancellation, or once the graph is
    /// gone or its track has ended.
    async fn sample_loop(
        state: Arc<Mutex<MonitorState>>,
        token: CancellationToken,
        period: Duration,
        quiet_threshold: f32,
        delegate: Option<Arc<dyn ReadinessDelegate>>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(level) = Self::tick(&state, quiet_threshold) else {
                        log::debug!("Level monitor source ended; sampling stopped");
                        break;
                    };
                    if let Some(ref d) = delegate {
                        d.on_level_updated(&level);
                    }
                }
            }
        }
    }
}

impl Drop for AudioLevelMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::DeviceKind;
    use crate::monitor::level::LevelClass;
    use crate::test_support::{noise, FakeTrack, RecordingDelegate};

    fn monitor_with_delegate() -> (AudioLevelMonitor, Arc<RecordingDelegate>) {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut monitor = AudioLevelMonitor::new(&ReadinessConfig {
            smoothing: 0.0,
            ..ReadinessConfig::default()
        });
        monitor.set_delegate(delegate.clone());
        (monitor, delegate)
    }

    #[tokio::test(start_paused = true)]
    async fn silent_microphone_reads_too_quiet() {
        let (monitor, delegate) = monitor_with_delegate();
        monitor.attach(FakeTrack::new("mic-1", DeviceKind::Microphone)).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(delegate.level_count() > 0);
        assert_eq!(monitor.current_level().unwrap().class, LevelClass::TooQuiet);
    }

    #[tokio::test(start_paused = true)]
    async fn speech_reads_working_well() {
        let (monitor, _delegate) = monitor_with_delegate();
        let mic = FakeTrack::new("mic-1", DeviceKind::Microphone);
        mic.audio_tap().unwrap().push(&noise(1024, 0.5));
        monitor.attach(mic).unwrap();

        let level = monitor.sample_now().unwrap();
        assert_eq!(level.class, LevelClass::WorkingWell);
    }

    #[tokio::test(start_paused = true)]
    async fn detach_stops_publishing() {
        let (monitor, delegate) = monitor_with_delegate();
        let token = monitor.attach(FakeTrack::new("mic-1", DeviceKind::Microphone)).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        monitor.detach();
        assert!(token.is_cancelled());
        assert!(!monitor.is_attached());

        let published = delegate.level_count();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(delegate.level_count(), published);
        assert!(monitor.current_level().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn detach_is_idempotent() {
        let (monitor, _delegate) = monitor_with_delegate();
        monitor.detach();
        monitor.attach(FakeTrack::new("mic-1", DeviceKind::Microphone)).unwrap();
        monitor.detach();
        monitor.detach();
        assert!(!monitor.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn ended_track_stops_the_loop() {
        let (monitor, delegate) = monitor_with_delegate();
        let mic = FakeTrack::new("mic-1", DeviceKind::Microphone);
        monitor.attach(mic.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        mic.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let published = delegate.level_count();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(delegate.level_count(), published);
        assert!(monitor.sample_now().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reattach_cancels_previous_loop() {
        let (monitor, _delegate) = monitor_with_delegate();
        let first = monitor.attach(FakeTrack::new("mic-1", DeviceKind::Microphone)).unwrap();
        let second = monitor.attach(FakeTrack::new("mic-2", DeviceKind::Microphone)).unwrap();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn attach_rejects_video_tracks() {
        let (monitor, _delegate) = monitor_with_delegate();
        let camera = FakeTrack::new("cam-1", DeviceKind::Camera);
        // Fails before anything is spawned, so no runtime is needed.
        assert!(monitor.attach(camera).is_err());
        assert!(!monitor.is_attached());
    }
}
