use std::sync::Arc;

use async_trait::async_trait;

use crate::models::device::{DeviceDescriptor, DeviceKind};
use crate::models::error::ReadinessError;
use crate::processing::audio_tap::AudioTap;

/// Which device a capture request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackRequest {
    /// Let the host pick (usually the system default).
    Any,
    /// A specific device id from the catalog.
    Exact(String),
}

impl TrackRequest {
    pub fn from_selection(id: Option<&str>) -> Self {
        match id {
            Some(id) => Self::Exact(id.to_string()),
            None => Self::Any,
        }
    }
}

/// Constraints for a single `MediaDevices::open` call.
///
/// Leaving a kind at `None` means no track of that kind is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub video: Option<TrackRequest>,
    pub audio: Option<TrackRequest>,
}

impl CaptureConstraints {
    pub fn camera(id: Option<&str>) -> Self {
        Self {
            video: Some(TrackRequest::from_selection(id)),
            audio: None,
        }
    }

    pub fn microphone(id: Option<&str>) -> Self {
        Self {
            video: None,
            audio: Some(TrackRequest::from_selection(id)),
        }
    }

    /// Audio and video together, as used to unlock device labels.
    pub fn combined() -> Self {
        Self {
            video: Some(TrackRequest::Any),
            audio: Some(TrackRequest::Any),
        }
    }
}

/// A live capture track opened by the host.
///
/// `stop` must be idempotent: the engine calls it on every release path and
/// may call it again during teardown.
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> DeviceKind;

    fn label(&self) -> String;

    /// Whether the track is still delivering media.
    fn is_live(&self) -> bool;

    /// Release the underlying device.
    fn stop(&self);

    /// Sample tap for audio tracks; `None` for video.
    fn audio_tap(&self) -> Option<AudioTap> {
        None
    }
}

/// Tracks returned by one `open` call.
pub struct MediaStream {
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    /// Remove and return the first track of `kind`.
    pub fn take_track(&mut self, kind: DeviceKind) -> Option<Arc<dyn MediaTrack>> {
        let index = self.tracks.iter().position(|t| t.kind() == kind)?;
        Some(self.tracks.remove(index))
    }

    /// Stop every remaining track.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Host capability to list and open capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// List every capture endpoint. Labels may be empty before permission is granted.
    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ReadinessError>;

    /// Open a capture stream. Suspends while the OS or the user decides on
    /// permission; there is no timeout.
    async fn open(&self, constraints: &CaptureConstraints) -> Result<MediaStream, ReadinessError>;
}
