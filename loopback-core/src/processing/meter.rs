use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::diagnostics::AudioLevels;
use crate::traits::block_processor::BlockProcessor;

/// Pass-through processor that meters what flows through it.
///
/// Output channel `n` is a copy of input channel `n`; outputs without a
/// matching input are silent. Levels of the last block (folded across
/// inputs) are published through a [`MeterHandle`].
pub struct MeterProcessor {
    channels: usize,
    levels: Arc<Mutex<AudioLevels>>,
    sample_rate: f64,
    block_size: usize,
    processing: bool,
}

/// Read side of a [`MeterProcessor`], cheap to clone across threads.
#[derive(Clone)]
pub struct MeterHandle {
    levels: Arc<Mutex<AudioLevels>>,
}

impl MeterHandle {
    pub fn levels(&self) -> AudioLevels {
        *self.levels.lock()
    }
}

impl MeterProcessor {
    pub fn new(channels: usize) -> (Self, MeterHandle) {
        let levels = Arc::new(Mutex::new(AudioLevels::default()));
        let meter = Self {
            channels,
            levels: Arc::clone(&levels),
            sample_rate: 0.0,
            block_size: 0,
            processing: false,
        };
        (meter, MeterHandle { levels })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }
}

impl BlockProcessor for MeterProcessor {
    fn num_inputs(&self) -> usize {
        self.channels
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn stop_processing(&mut self) {
        self.processing = false;
    }

    fn prepare_for_processing(&mut self, sample_rate: f64, block_size: usize) {
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        *self.levels.lock() = AudioLevels::default();
    }

    fn start_processing(&mut self) {
        self.processing = true;
    }

    fn process_replacing(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], block_size: usize) {
        let mut folded = AudioLevels::default();
        for input in inputs {
            folded = folded.max(AudioLevels::measure(&input[..block_size]));
        }
        *self.levels.lock() = folded;

        for (ch, output) in outputs.iter_mut().enumerate() {
            match inputs.get(ch) {
                Some(input) => output[..block_size].copy_from_slice(&input[..block_size]),
                None => output[..block_size].fill(0.0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn copies_inputs_and_silences_unmatched_outputs() {
        let (mut meter, _handle) = MeterProcessor::new(2);
        let left = [0.5, -0.5];
        let right = [0.25, 0.25];
        let mut out = vec![[9.0f32; 2]; 3];
        let mut outputs: Vec<&mut [f32]> = out.iter_mut().map(|o| &mut o[..]).collect();

        meter.process_replacing(&[&left[..], &right[..]], &mut outputs, 2);

        assert_eq!(out[0], left);
        assert_eq!(out[1], right);
        assert_eq!(out[2], [0.0, 0.0]);
    }

    #[test]
    fn publishes_loudest_channel() {
        let (mut meter, handle) = MeterProcessor::new(2);
        let quiet = [0.1, -0.1];
        let loud = [0.8, -0.6];

        meter.process_replacing(&[&quiet[..], &loud[..]], &mut [], 2);

        let levels = handle.levels();
        assert_relative_eq!(levels.peak, 0.8);
        assert_relative_eq!(levels.rms, 0.5f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn start_and_stop_toggle_processing() {
        let (mut meter, _handle) = MeterProcessor::new(2);
        assert!(!meter.is_processing());

        meter.prepare_for_processing(48000.0, 512);
        meter.start_processing();
        assert!(meter.is_processing());

        meter.stop_processing();
        assert!(!meter.is_processing());
    }

    #[test]
    fn prepare_resets_levels() {
        let (mut meter, handle) = MeterProcessor::new(1);
        meter.process_replacing(&[&[1.0][..]], &mut [], 1);
        assert_relative_eq!(handle.levels().peak, 1.0);

        meter.prepare_for_processing(44100.0, 256);

        assert_eq!(handle.levels(), AudioLevels::default());
        assert_eq!(meter.block_size(), 256);
        assert_relative_eq!(meter.sample_rate(), 44100.0);
    }
}
