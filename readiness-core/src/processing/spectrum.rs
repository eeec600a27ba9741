use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Lower end of the byte scale, in dBFS.
pub const MIN_DECIBELS: f32 = -100.0;
/// Upper end of the byte scale, in dBFS.
pub const MAX_DECIBELS: f32 = -30.0;

/// Frequency-domain analyser producing one byte (0–255) per bin.
///
/// Mirrors the behaviour of a browser `AnalyserNode`: Blackman window,
/// magnitude normalised by the FFT size, exponential smoothing across
/// frames, then a linear map of `[MIN_DECIBELS, MAX_DECIBELS]` onto `0..=255`.
pub struct SpectrumAnalyser {
    fft_size: usize,
    smoothing: f32,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl SpectrumAnalyser {
    /// `fft_size` must be a power of two; `smoothing` is clamped into `0.0..=1.0`.
    pub fn new(fft_size: usize, smoothing: f32) -> Self {
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / fft_size as f32;
                0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let bins = fft_size / 2;

        Self {
            fft_size,
            smoothing: smoothing.clamp(0.0, 1.0),
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyse the newest frame. Shorter input is zero-padded at the front,
    /// longer input contributes only its last `fft_size` samples.
    pub fn process(&mut self, samples: &[f32]) {
        let frame = if samples.len() > self.fft_size {
            &samples[samples.len() - self.fft_size..]
        } else {
            samples
        };
        let pad = self.fft_size - frame.len();

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { frame[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        let scale = 255.0 / (MAX_DECIBELS - MIN_DECIBELS);
        for bin in 0..self.smoothed.len() {
            let magnitude = self.scratch[bin].norm() * norm;
            let value = self.smoothing * self.smoothed[bin] + (1.0 - self.smoothing) * magnitude;
            // Keep the history finite so silence does not poison later frames.
            self.smoothed[bin] = if value.is_finite() { value } else { 0.0 };

            let db = if self.smoothed[bin] > 0.0 {
                20.0 * self.smoothed[bin].log10()
            } else {
                f32::NEG_INFINITY
            };
            self.bytes[bin] = ((db - MIN_DECIBELS) * scale).clamp(0.0, 255.0) as u8;
        }
    }

    /// Byte magnitudes of the last processed frame.
    pub fn byte_frequency_data(&self) -> &[u8] {
        &self.bytes
    }

    /// Mean byte energy over all bins, 0.0–255.0.
    pub fn mean_energy(&self) -> f32 {
        if self.bytes.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.bytes.iter().map(|&b| b as u32).sum();
        sum as f32 / self.bytes.len() as f32
    }

    /// Drop the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("bins", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::noise;

    #[test]
    fn silence_maps_to_zero() {
        let mut analyser = SpectrumAnalyser::new(256, 0.8);
        analyser.process(&vec![0.0; 256]);

        assert_eq!(analyser.bin_count(), 128);
        assert!(analyser.byte_frequency_data().iter().all(|&b| b == 0));
        assert_eq!(analyser.mean_energy(), 0.0);
    }

    #[test]
    fn loud_noise_fills_the_spectrum() {
        let mut analyser = SpectrumAnalyser::new(256, 0.0);
        analyser.process(&noise(256, 0.5));

        assert!(analyser.mean_energy() > 150.0, "energy {}", analyser.mean_energy());
    }

    #[test]
    fn faint_noise_stays_below_quiet_threshold() {
        let mut analyser = SpectrumAnalyser::new(256, 0.0);
        analyser.process(&noise(256, 0.000_01));

        assert!(analyser.mean_energy() < 10.0, "energy {}", analyser.mean_energy());
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let mut analyser = SpectrumAnalyser::new(256, 0.0);
        // Bin 16 of a 256-point FFT.
        let tone: Vec<f32> = (0..256)
            .map(|i| 0.5 * (2.0 * PI * 16.0 * i as f32 / 256.0).sin())
            .collect();
        analyser.process(&tone);

        let bytes = analyser.byte_frequency_data();
        let peak = (0..bytes.len()).max_by_key(|&i| bytes[i]).unwrap();
        assert!((15..=17).contains(&peak));
        assert_eq!(bytes[100], 0);
    }

    #[test]
    fn smoothing_carries_energy_into_silence() {
        let mut analyser = SpectrumAnalyser::new(256, 0.8);
        analyser.process(&noise(256, 0.5));
        let loud = analyser.mean_energy();
        analyser.process(&vec![0.0; 256]);
        let decayed = analyser.mean_energy();

        assert!(decayed > 0.0 && decayed < loud);

        analyser.reset();
        assert_eq!(analyser.mean_energy(), 0.0);
    }

    #[test]
    fn short_frames_are_zero_padded() {
        let mut analyser = SpectrumAnalyser::new(256, 0.0);
        analyser.process(&noise(64, 0.5));
        assert!(analyser.mean_energy() > 0.0);
    }
}
