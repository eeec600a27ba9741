//! cpal media devices.
//!
//! Microphones and speakers come from the default cpal host. cpal has no
//! video support, so cameras never enumerate and every video request fails
//! with `DeviceNotFound`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use readiness_core::{
    AudioTap, CaptureConstraints, DeviceDescriptor, DeviceKind, MediaDevices, MediaStream, MediaTrack,
    ReadinessConfig, ReadinessError, TrackRequest,
};

use crate::error::HostError;

const INPUT_PREFIX: &str = "input:";
const OUTPUT_PREFIX: &str = "output:";

/// cpal exposes no stable ids; names are the best handle it offers.
fn device_id(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

pub struct CpalMediaDevices {
    tap_capacity: usize,
}

impl CpalMediaDevices {
    pub fn new(config: &ReadinessConfig) -> Self {
        Self {
            tap_capacity: config.tap_capacity,
        }
    }
}

#[async_trait]
impl MediaDevices for CpalMediaDevices {
    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ReadinessError> {
        let devices = tokio::task::spawn_blocking(list_devices)
            .await
            .map_err(|e| ReadinessError::EnumerationFailed(e.to_string()))??;
        log::debug!("cpal host {:?}: {} devices", cpal::default_host().id(), devices.len());
        Ok(devices)
    }

    async fn open(&self, constraints: &CaptureConstraints) -> Result<MediaStream, ReadinessError> {
        if constraints.video.is_some() {
            log::debug!("Video requested from an audio-only backend");
            return Err(ReadinessError::DeviceNotFound);
        }
        let Some(request) = constraints.audio.clone() else {
            return Err(ReadinessError::AcquisitionFailed("no track requested".into()));
        };

        let track = CpalMicTrack::start(request, self.tap_capacity).await?;
        Ok(MediaStream::new(vec![Arc::new(track) as Arc<dyn MediaTrack>]))
    }
}

fn list_devices() -> Result<Vec<DeviceDescriptor>, HostError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    for device in host.input_devices()? {
        match device.name() {
            Ok(name) => devices.push(DeviceDescriptor::new(
                device_id(INPUT_PREFIX, &name),
                name,
                DeviceKind::Microphone,
            )),
            Err(e) => log::debug!("Skipping unnamed input device: {}", e),
        }
    }
    for device in host.output_devices()? {
        match device.name() {
            Ok(name) => devices.push(DeviceDescriptor::new(
                device_id(OUTPUT_PREFIX, &name),
                name,
                DeviceKind::Speaker,
            )),
            Err(e) => log::debug!("Skipping unnamed output device: {}", e),
        }
    }
    Ok(devices)
}

fn find_input(request: &TrackRequest) -> Result<cpal::Device, HostError> {
    let host = cpal::default_host();
    match request {
        TrackRequest::Any => host.default_input_device().ok_or(HostError::NoDefaultDevice),
        TrackRequest::Exact(id) => {
            let name = id.strip_prefix(INPUT_PREFIX).unwrap_or(id);
            host.input_devices()?
                .find(|d| d.name().is_ok_and(|n| n == name))
                .ok_or_else(|| HostError::NoSuchDevice(id.clone()))
        }
    }
}

/// What the capture thread reports once its stream is playing.
struct OpenedInput {
    id: String,
    label: String,
    tap: AudioTap,
}

/// Live microphone track.
///
/// The cpal stream is built, played and dropped on a dedicated thread,
/// since `cpal::Stream` cannot move between threads. Samples land in the
/// track's `AudioTap`, downmixed to mono.
///
/// `stop` never blocks: it drops the stop sender to wake the thread and
/// joins it on the blocking pool when called from a runtime.
pub struct CpalMicTrack {
    id: String,
    label: String,
    tap: AudioTap,
    running: Arc<AtomicBool>,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalMicTrack {
    async fn start(request: TrackRequest, tap_capacity: usize) -> Result<Self, ReadinessError> {
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                mic_capture_loop(stop_rx, &request, tap_capacity, ready_tx);
                thread_running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| HostError::Thread(format!("failed to spawn mic thread: {}", e)))?;

        let opened = match ready_rx.await {
            Ok(Ok(opened)) => opened,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e.into());
            }
            Err(_) => {
                drop(stop_tx);
                let _ = handle.join();
                return Err(HostError::Thread("mic thread exited before reporting".into()).into());
            }
        };

        log::info!("Mic capture started on {}", opened.label);
        Ok(Self::from_parts(opened, running, stop_tx, handle))
    }

    fn from_parts(
        opened: OpenedInput,
        running: Arc<AtomicBool>,
        stop_tx: mpsc::Sender<()>,
        handle: thread::JoinHandle<()>,
    ) -> Self {
        Self {
            id: opened.id,
            label: opened.label,
            tap: opened.tap,
            running,
            stop_tx: Mutex::new(Some(stop_tx)),
            capture_handle: Mutex::new(Some(handle)),
        }
    }
}

impl MediaTrack for CpalMicTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Microphone
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_live(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the sender wakes the capture thread.
        self.stop_tx.lock().take();

        let Some(handle) = self.capture_handle.lock().take() else {
            return;
        };
        let label = self.label.clone();
        let reap = move || {
            if handle.join().is_err() {
                log::warn!("Mic capture thread on {} panicked", label);
            } else {
                log::debug!("Mic capture on {} stopped", label);
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(reap);
            }
            Err(_) => reap(),
        }
    }

    fn audio_tap(&self) -> Option<AudioTap> {
        Some(self.tap.clone())
    }
}

impl Drop for CpalMicTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the capture thread: open, report, then hold the stream until
/// the track's stop sender is dropped or the requester went away.
fn mic_capture_loop(
    stop: mpsc::Receiver<()>,
    request: &TrackRequest,
    tap_capacity: usize,
    ready: oneshot::Sender<Result<OpenedInput, HostError>>,
) {
    let stream = match open_input(request, tap_capacity) {
        Ok((stream, opened)) => {
            if ready.send(Ok(opened)).is_err() {
                log::debug!("Mic request abandoned before the stream started");
                return;
            }
            stream
        }
        Err(e) => {
            log::warn!("Mic capture failed to start: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };

    // Only ever disconnects; no message is sent.
    let _ = stop.recv();
    drop(stream);
}

fn open_input(request: &TrackRequest, tap_capacity: usize) -> Result<(cpal::Stream, OpenedInput), HostError> {
    let device = find_input(request)?;
    let label = device.name().unwrap_or_else(|_| "Microphone".into());
    let supported = device.default_input_config()?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    let tap = AudioTap::new(tap_capacity, config.sample_rate.0 as f64);

    let on_error = |e: cpal::StreamError| log::error!("Mic stream error: {}", e);
    let stream = match sample_format {
        SampleFormat::F32 => {
            let tap = tap.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| tap.push_interleaved(data, channels),
                on_error,
                None,
            )?
        }
        SampleFormat::I16 => {
            let tap = tap.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                    tap.push_interleaved(&samples, channels);
                },
                on_error,
                None,
            )?
        }
        SampleFormat::U16 => {
            let tap = tap.clone();
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<f32> = data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0).collect();
                    tap.push_interleaved(&samples, channels);
                },
                on_error,
                None,
            )?
        }
        other => return Err(HostError::SampleFormat(other)),
    };
    stream.play()?;

    let opened = OpenedInput {
        id: device_id(INPUT_PREFIX, &label),
        label,
        tap,
    };
    Ok((stream, opened))
}
