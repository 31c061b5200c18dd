/// FIFO of interleaved samples waiting to be consumed in whole blocks.
///
/// Packets arrive in arbitrary sizes; the bridge appends each one and then
/// drains as many full blocks as are available. After a drain the remainder
/// is always shorter than one block. Not thread-safe on its own: it lives
/// inside the bridge, behind the bridge's mutex.
#[derive(Debug, Default)]
pub struct AccumulationBuffer {
    samples: Vec<f32>,
}

impl AccumulationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate room for `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append samples to the back.
    pub fn append(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Whether at least `block_samples` samples are buffered.
    pub fn has_block(&self, block_samples: usize) -> bool {
        block_samples > 0 && self.samples.len() >= block_samples
    }

    /// The oldest `block_samples` samples, or `None` if not enough are buffered.
    pub fn front_block(&self, block_samples: usize) -> Option<&[f32]> {
        if self.has_block(block_samples) {
            Some(&self.samples[..block_samples])
        } else {
            None
        }
    }

    /// Remove up to `count` samples from the front.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.samples.len());
        self.samples.drain(..count);
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop everything buffered, keeping the allocation.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
