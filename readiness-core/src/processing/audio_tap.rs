use std::sync::Arc;

use parking_lot::Mutex;

use super::ring_buffer::RingBuffer;

/// Shared handle onto the recent mono samples of a live audio track.
///
/// The capture side pushes buffers as they arrive; the analysis graph reads
/// the newest frame on every sampling tick. Cloning shares the same buffer.
#[derive(Debug, Clone)]
pub struct AudioTap {
    buffer: Arc<Mutex<RingBuffer>>,
    sample_rate: f64,
}

impl AudioTap {
    pub fn new(capacity: usize, sample_rate: f64) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(RingBuffer::new(capacity))),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Push mono samples.
    pub fn push(&self, samples: &[f32]) {
        self.buffer.lock().write(samples);
    }

    /// Push interleaved samples, averaging channels down to mono first.
    pub fn push_interleaved(&self, samples: &[f32], channels: usize) {
        if channels <= 1 {
            self.push(samples);
            return;
        }
        let scale = 1.0 / channels as f32;
        let mono: Vec<f32> = samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect();
        self.push(&mono);
    }

    /// Newest `count` samples, oldest first. Shorter if fewer were pushed.
    pub fn latest(&self, count: usize) -> Vec<f32> {
        self.buffer.lock().latest(count)
    }

    pub fn clear(&self) {
        self.buffer.lock().reset();
    }
}
