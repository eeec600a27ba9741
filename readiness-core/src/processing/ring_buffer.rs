/// Fixed-capacity circular buffer of the most recent audio samples.
///
/// Capture threads append with `write`; the level analyser peeks the newest
/// frame with `latest` without consuming anything. Wrap in
/// `Arc<parking_lot::Mutex<RingBuffer>>` for cross-thread access.
///
/// Overflow behavior: drops oldest samples.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    write_index: usize,
    available: usize,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0.0; capacity],
            write_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Append samples, dropping the oldest on overflow.
    ///
    /// If `samples` is larger than capacity, only the last `capacity` samples are kept.
    pub fn write(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let samples = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available = (self.available + samples.len()).min(self.capacity);
    }

    /// Copy out the newest `count` samples in chronological order.
    ///
    /// Returns fewer samples if fewer have been written.
    pub fn latest(&self, count: usize) -> Vec<f32> {
        let to_copy = count.min(self.available);
        let start = (self.write_index + self.capacity - to_copy) % self.capacity;
        (0..to_copy)
            .map(|i| self.buffer[(start + i) % self.capacity])
            .collect()
    }

    /// Number of samples currently held.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Forget every held sample.
    pub fn reset(&mut self) {
        self.write_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
