use std::sync::Arc;

use crate::models::error::ReadinessError;
use crate::processing::audio_tap::AudioTap;
use crate::processing::spectrum::SpectrumAnalyser;
use crate::traits::media_devices::MediaTrack;

/// Frequency-domain analysis graph connected to one live audio track.
///
/// Holds the track handle only to observe liveness; the samples come from
/// the track's tap.
pub struct AnalysisGraph {
    track: Arc<dyn MediaTrack>,
    tap: AudioTap,
    analyser: SpectrumAnalyser,
}

impl AnalysisGraph {
    pub fn connect(
        track: Arc<dyn MediaTrack>,
        fft_size: usize,
        smoothing: f32,
    ) -> Result<Self, ReadinessError> {
        let tap = track.audio_tap().ok_or_else(|| {
            ReadinessError::AcquisitionFailed(format!("track {} exposes no audio tap", track.id()))
        })?;
        Ok(Self {
            track,
            tap,
            analyser: SpectrumAnalyser::new(fft_size, smoothing),
        })
    }

    pub fn is_live(&self) -> bool {
        self.track.is_live()
    }

    pub fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    /// Analyse the newest frame and return its mean bin energy (0–255).
    pub fn sample(&mut self) -> f32 {
        let frame = self.tap.latest(self.analyser.fft_size());
        self.analyser.process(&frame);
        self.analyser.mean_energy()
    }

    pub fn frequency_data(&self) -> &[u8] {
        self.analyser.byte_frequency_data()
    }
}
