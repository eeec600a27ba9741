use std::sync::Arc;

use super::media_devices::MediaTrack;

/// Surface that shows the live camera preview.
pub trait PreviewSink: Send + Sync {
    fn attach(&self, track: Arc<dyn MediaTrack>);

    /// Detach whatever is attached. Must be safe to call when nothing is.
    fn detach(&self);
}

/// Preview sink for hosts without a video surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPreview;

impl PreviewSink for NullPreview {
    fn attach(&self, track: Arc<dyn MediaTrack>) {
        log::debug!("No preview surface; camera track {} not shown", track.id());
    }

    fn detach(&self) {}
}
