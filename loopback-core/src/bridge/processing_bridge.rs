use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::{BridgeConfig, MAX_CHANNELS};
use crate::models::diagnostics::BridgeDiagnostics;
use crate::models::error::CaptureError;
use crate::processing::accumulation_buffer::AccumulationBuffer;
use crate::processing::deinterleave::deinterleave_block;
use crate::traits::block_processor::BlockProcessor;
use crate::traits::packet_consumer::{AudioPacket, PacketConsumer};

/// Block layout the attached processor was last prepared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingConfiguration {
    pub sample_rate: u32,
    pub block_size: usize,
    /// Processor inputs, clamped to the configured channel limit.
    pub num_inputs: usize,
    /// Processor outputs, clamped to the configured channel limit.
    pub num_outputs: usize,
}

/// The bridge behind the mutex that the capture engine try-locks.
pub type SharedBridge = Arc<Mutex<ProcessingBridge>>;

/// Feeds captured packets into a block processor in fixed-size blocks.
///
/// Data flow per packet:
/// ```text
/// [interleaved packet] → [AccumulationBuffer] → deinterleave → [input scratch]
///                                                                   ↓
///                          [output scratch] ← process_replacing(inputs, outputs)
/// ```
///
/// The bridge is shared as a [`SharedBridge`]. Its mutex is the only lock
/// between the capture thread and the owner thread: the engine try-locks it
/// to deliver, and the owner locks it to swap or inspect the
/// processor. Scratch buffers are sized on reconfiguration and reused for
/// every block.
pub struct ProcessingBridge {
    config: BridgeConfig,
    processor: Option<Box<dyn BlockProcessor>>,
    consuming: bool,
    current: Option<ProcessingConfiguration>,
    accumulator: AccumulationBuffer,
    input_scratch: Vec<f32>,
    output_scratch: Vec<f32>,
    diagnostics: BridgeDiagnostics,
}

impl ProcessingBridge {
    pub fn new(config: BridgeConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        Ok(Self {
            config,
            processor: None,
            consuming: false,
            current: None,
            accumulator: AccumulationBuffer::new(),
            input_scratch: Vec::new(),
            output_scratch: Vec::new(),
            diagnostics: BridgeDiagnostics::default(),
        })
    }

    /// Build a bridge already wrapped for sharing with the capture engine.
    pub fn shared(config: BridgeConfig) -> Result<SharedBridge, CaptureError> {
        Ok(Arc::new(Mutex::new(Self::new(config)?)))
    }

    /// Install a processor, returning the one it replaces.
    ///
    /// The new processor is prepared on the next packet.
    pub fn attach_processor(&mut self, processor: Box<dyn BlockProcessor>) -> Option<Box<dyn BlockProcessor>> {
        let previous = self.detach_processor();
        self.processor = Some(processor);
        previous
    }

    /// Remove the processor, stopping it if it was prepared.
    pub fn detach_processor(&mut self) -> Option<Box<dyn BlockProcessor>> {
        let mut previous = self.processor.take();
        if let (Some(processor), Some(_)) = (previous.as_mut(), self.current) {
            processor.stop_processing();
        }
        self.reset();
        previous
    }

    /// Whether packets should reach the processor (e.g. its editor is embedded
    /// or its dialog is open). Turning consumption off discards buffered audio.
    pub fn set_consuming(&mut self, consuming: bool) {
        if self.consuming && !consuming {
            self.accumulator.clear();
        }
        self.consuming = consuming;
    }

    pub fn is_consuming(&self) -> bool {
        self.consuming
    }

    /// True when packets will actually be processed.
    pub fn is_active(&self) -> bool {
        self.consuming && self.processor.is_some()
    }

    pub fn processor_mut(&mut self) -> Option<&mut (dyn BlockProcessor + 'static)> {
        self.processor.as_deref_mut()
    }

    pub fn configuration(&self) -> Option<ProcessingConfiguration> {
        self.current
    }

    /// Interleaved samples waiting for a full block.
    pub fn buffered_samples(&self) -> usize {
        self.accumulator.len()
    }

    /// Output channel `ch` of the most recent block.
    pub fn output_channel(&self, ch: usize) -> Option<&[f32]> {
        let config = self.current?;
        if ch >= config.num_outputs {
            return None;
        }
        let start = ch * config.block_size;
        self.output_scratch.get(start..start + config.block_size)
    }

    pub fn diagnostics(&self) -> BridgeDiagnostics {
        self.diagnostics.clone()
    }

    /// Accumulate one packet and process every full block it completes.
    ///
    /// Inert unless a processor is attached and the bridge is consuming.
    /// A sample-rate change (or the first packet) reconfigures the processor;
    /// a channel-count change alone does not.
    pub fn on_samples(&mut self, samples: &[f32], channels: u16, sample_rate: u32) {
        if !self.is_active() || channels == 0 {
            self.diagnostics.packets_ignored += 1;
            return;
        }

        if self.current.map(|c| c.sample_rate) != Some(sample_rate) {
            self.reconfigure(sample_rate);
        }

        let (Some(config), Some(processor)) = (self.current, self.processor.as_mut()) else {
            return;
        };

        self.accumulator.append(samples);

        let source_channels = channels as usize;
        let block_size = config.block_size;
        let block_samples = block_size * source_channels;

        while let Some(block) = self.accumulator.front_block(block_samples) {
            deinterleave_block(block, source_channels, block_size, &mut self.input_scratch);

            let empty: &[f32] = &[];
            let mut inputs = [empty; MAX_CHANNELS];
            for (slot, region) in inputs.iter_mut().zip(self.input_scratch.chunks_exact(block_size)) {
                *slot = region;
            }

            let mut outputs: [&mut [f32]; MAX_CHANNELS] = Default::default();
            for (slot, region) in outputs.iter_mut().zip(self.output_scratch.chunks_exact_mut(block_size)) {
                *slot = region;
            }

            processor.process_replacing(
                &inputs[..config.num_inputs],
                &mut outputs[..config.num_outputs],
                block_size,
            );

            self.accumulator.consume(block_samples);
            self.diagnostics.blocks_processed += 1;
        }
    }

    // --- Internal helpers ---

    fn reconfigure(&mut self, sample_rate: u32) {
        let Some(processor) = self.processor.as_mut() else {
            return;
        };

        log::info!(
            "Audio config change. Rate: {} Hz (old: {})",
            sample_rate,
            self.current
                .map(|c| format!("{} Hz", c.sample_rate))
                .unwrap_or_else(|| "unconfigured".into())
        );

        processor.stop_processing();

        let block_size = self.config.block_size;
        let reported_inputs = processor.num_inputs();
        let reported_outputs = processor.num_outputs();
        let num_inputs = reported_inputs.min(self.config.max_channels);
        let num_outputs = reported_outputs.min(self.config.max_channels);
        if num_inputs != reported_inputs || num_outputs != reported_outputs {
            log::debug!(
                "Clamped processor channels: inputs {} -> {}, outputs {} -> {}",
                reported_inputs,
                num_inputs,
                reported_outputs,
                num_outputs
            );
        }
        log::info!(
            "Processing config. Inputs: {}, Outputs: {}, Block: {}",
            num_inputs,
            num_outputs,
            block_size
        );

        self.input_scratch.clear();
        self.input_scratch.resize(block_size * num_inputs, 0.0);
        self.output_scratch.clear();
        self.output_scratch.resize(block_size * num_outputs, 0.0);
        self.accumulator.clear();

        processor.prepare_for_processing(sample_rate as f64, block_size);
        processor.start_processing();

        self.current = Some(ProcessingConfiguration {
            sample_rate,
            block_size,
            num_inputs,
            num_outputs,
        });
        self.diagnostics.reconfigurations += 1;
    }

    fn reset(&mut self) {
        self.current = None;
        self.accumulator.clear();
        self.input_scratch.clear();
        self.output_scratch.clear();
    }
}

impl PacketConsumer for ProcessingBridge {
    fn on_packet(&mut self, packet: &AudioPacket<'_>) {
        self.on_samples(packet.samples, packet.channels, packet.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::meter::MeterProcessor;

    /// Everything a [`RecordingProcessor`] saw, shared with the test body.
    #[derive(Debug, Default)]
    struct ProcessorLog {
        calls: Vec<&'static str>,
        prepared: Vec<(f64, usize)>,
        /// Copy of every input channel, per processed block.
        blocks: Vec<Vec<Vec<f32>>>,
        output_counts: Vec<usize>,
    }

    struct RecordingProcessor {
        inputs: usize,
        outputs: usize,
        log: Arc<Mutex<ProcessorLog>>,
    }

    impl RecordingProcessor {
        fn boxed(inputs: usize, outputs: usize) -> (Box<dyn BlockProcessor>, Arc<Mutex<ProcessorLog>>) {
            let log = Arc::new(Mutex::new(ProcessorLog::default()));
            let processor = Self {
                inputs,
                outputs,
                log: Arc::clone(&log),
            };
            (Box::new(processor), log)
        }
    }

    impl BlockProcessor for RecordingProcessor {
        fn num_inputs(&self) -> usize {
            self.inputs
        }

        fn num_outputs(&self) -> usize {
            self.outputs
        }

        fn stop_processing(&mut self) {
            self.log.lock().calls.push("stop");
        }

        fn prepare_for_processing(&mut self, sample_rate: f64, block_size: usize) {
            let mut log = self.log.lock();
            log.calls.push("prepare");
            log.prepared.push((sample_rate, block_size));
        }

        fn start_processing(&mut self) {
            self.log.lock().calls.push("start");
        }

        fn process_replacing(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], block_size: usize) {
            for output in outputs.iter_mut() {
                assert_eq!(output.len(), block_size);
                output.fill(0.5);
            }
            let mut log = self.log.lock();
            log.calls.push("process");
            log.blocks.push(inputs.iter().map(|i| i.to_vec()).collect());
            log.output_counts.push(outputs.len());
        }
    }

    fn active_bridge(block_size: usize, inputs: usize, outputs: usize) -> (ProcessingBridge, Arc<Mutex<ProcessorLog>>) {
        let mut bridge = ProcessingBridge::new(BridgeConfig {
            block_size,
            ..Default::default()
        })
        .unwrap();
        let (processor, log) = RecordingProcessor::boxed(inputs, outputs);
        bridge.attach_processor(processor);
        bridge.set_consuming(true);
        (bridge, log)
    }

    /// `frames` interleaved frames where sample = `ch * 1000 + frame`.
    fn patterned(channels: usize, frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|frame| (0..channels).map(move |ch| (ch * 1000 + frame) as f32))
            .collect()
    }

    #[test]
    fn invalid_config_rejected() {
        let result = ProcessingBridge::new(BridgeConfig {
            block_size: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(CaptureError::ConfigurationFailed(_))));
    }

    #[test]
    fn inert_without_processor() {
        let mut bridge = ProcessingBridge::new(BridgeConfig::default()).unwrap();
        bridge.set_consuming(true);

        bridge.on_samples(&[0.1; 2048], 2, 48000);

        assert_eq!(bridge.buffered_samples(), 0);
        assert!(bridge.configuration().is_none());
        assert_eq!(bridge.diagnostics().packets_ignored, 1);
    }

    #[test]
    fn inert_when_not_consuming() {
        let (mut bridge, log) = active_bridge(512, 2, 2);
        bridge.set_consuming(false);

        bridge.on_samples(&[0.1; 2048], 2, 48000);

        assert!(log.lock().calls.is_empty());
        assert!(bridge.configuration().is_none());
    }

    #[test]
    fn first_packet_prepares_processor() {
        let (mut bridge, log) = active_bridge(512, 2, 2);

        bridge.on_samples(&[0.0; 4], 2, 48000);

        let log = log.lock();
        assert_eq!(log.calls, vec!["stop", "prepare", "start"]);
        assert_eq!(log.prepared, vec![(48000.0, 512)]);
        assert_eq!(
            bridge.configuration(),
            Some(ProcessingConfiguration {
                sample_rate: 48000,
                block_size: 512,
                num_inputs: 2,
                num_outputs: 2,
            })
        );
    }

    #[test]
    fn end_to_end_two_packets_two_blocks() {
        let (mut bridge, log) = active_bridge(512, 2, 2);

        // 768 frames: one block processed, 256 frames left over.
        bridge.on_samples(&patterned(2, 768), 2, 48000);
        assert_eq!(log.lock().blocks.len(), 1);
        assert_eq!(bridge.buffered_samples(), 512);

        // 256 more frames complete the second block.
        bridge.on_samples(&patterned(2, 256), 2, 48000);
        assert_eq!(log.lock().blocks.len(), 2);
        assert_eq!(bridge.buffered_samples(), 0);

        let log = log.lock();
        let second = &log.blocks[1];
        // Second block = frames 512..768 of packet one + frames 0..256 of packet two.
        assert_eq!(second[0][0], 512.0);
        assert_eq!(second[0][255], 767.0);
        assert_eq!(second[0][256], 0.0);
        assert_eq!(second[1][256], 1000.0);
        assert_eq!(log.output_counts, vec![2, 2]);
        assert_eq!(bridge.diagnostics().blocks_processed, 2);
    }

    #[test]
    fn outputs_are_readable_after_processing() {
        let (mut bridge, _log) = active_bridge(64, 1, 2);
        bridge.on_samples(&[0.2; 64], 1, 44100);

        assert_eq!(bridge.output_channel(1), Some(&[0.5f32; 64][..]));
        assert!(bridge.output_channel(2).is_none());
    }

    #[test]
    fn buffer_stays_below_one_block() {
        let (mut bridge, _log) = active_bridge(128, 2, 2);

        for frames in [1usize, 100, 127, 128, 129, 300, 5, 64, 1000, 0] {
            bridge.on_samples(&patterned(2, frames), 2, 48000);
            assert!(bridge.buffered_samples() < 128 * 2);
        }
    }

    #[test]
    fn rate_change_reconfigures_and_clears() {
        let (mut bridge, log) = active_bridge(512, 2, 2);
        bridge.on_samples(&patterned(2, 700), 2, 48000);
        assert_eq!(bridge.buffered_samples(), 188 * 2);

        bridge.input_scratch.fill(7.0);
        bridge.output_scratch.fill(7.0);
        bridge.on_samples(&patterned(2, 10), 2, 44100);

        assert_eq!(bridge.buffered_samples(), 20);
        assert!(bridge.input_scratch.iter().all(|&s| s == 0.0));
        assert!(bridge.output_scratch.iter().all(|&s| s == 0.0));
        assert_eq!(bridge.configuration().unwrap().sample_rate, 44100);
        assert_eq!(log.lock().prepared, vec![(48000.0, 512), (44100.0, 512)]);
        assert_eq!(bridge.diagnostics().reconfigurations, 2);
    }

    #[test]
    fn channel_change_alone_does_not_reconfigure() {
        let (mut bridge, log) = active_bridge(512, 2, 2);
        bridge.on_samples(&patterned(2, 100), 2, 48000);

        bridge.on_samples(&patterned(6, 100), 6, 48000);

        assert_eq!(log.lock().prepared.len(), 1);
        assert_eq!(bridge.buffered_samples(), 200 + 600);
    }

    #[test]
    fn missing_source_channels_are_silent() {
        let (mut bridge, log) = active_bridge(8, 4, 1);

        bridge.on_samples(&patterned(2, 8), 2, 48000);

        let log = log.lock();
        let block = &log.blocks[0];
        assert_eq!(block.len(), 4);
        assert_eq!(block[0], (0..8).map(|f| f as f32).collect::<Vec<_>>());
        assert_eq!(block[1], (0..8).map(|f| (1000 + f) as f32).collect::<Vec<_>>());
        assert_eq!(block[2], vec![0.0; 8]);
        assert_eq!(block[3], vec![0.0; 8]);
    }

    #[test]
    fn extra_source_channels_are_ignored() {
        let (mut bridge, log) = active_bridge(4, 1, 1);

        bridge.on_samples(&patterned(3, 4), 3, 48000);

        assert_eq!(log.lock().blocks[0], vec![vec![0.0, 1.0, 2.0, 3.0]]);
    }

    #[test]
    fn channel_counts_clamped_to_limit() {
        let (mut bridge, log) = active_bridge(16, 64, 40);

        bridge.on_samples(&patterned(2, 16), 2, 48000);

        let config = bridge.configuration().unwrap();
        assert_eq!(config.num_inputs, MAX_CHANNELS);
        assert_eq!(config.num_outputs, MAX_CHANNELS);
        assert_eq!(bridge.input_scratch.len(), 16 * MAX_CHANNELS);
        assert_eq!(bridge.output_scratch.len(), 16 * MAX_CHANNELS);
        let log = log.lock();
        assert_eq!(log.blocks[0].len(), MAX_CHANNELS);
        assert_eq!(log.output_counts[0], MAX_CHANNELS);
    }

    #[test]
    fn lower_channel_limit_is_honored() {
        let mut bridge = ProcessingBridge::new(BridgeConfig {
            block_size: 4,
            max_channels: 2,
        })
        .unwrap();
        let (processor, log) = RecordingProcessor::boxed(8, 8);
        bridge.attach_processor(processor);
        bridge.set_consuming(true);

        bridge.on_samples(&patterned(2, 4), 2, 48000);

        assert_eq!(log.lock().blocks[0].len(), 2);
    }

    #[test]
    fn zero_channel_processor_still_runs_blocks() {
        let (mut bridge, log) = active_bridge(32, 0, 0);

        bridge.on_samples(&patterned(2, 96), 2, 48000);

        let log = log.lock();
        assert_eq!(log.blocks.len(), 3);
        assert!(log.blocks.iter().all(|b| b.is_empty()));
        assert_eq!(log.output_counts, vec![0, 0, 0]);
    }

    #[test]
    fn zero_channel_packet_is_ignored() {
        let (mut bridge, log) = active_bridge(32, 2, 2);

        bridge.on_samples(&[], 0, 48000);

        assert!(log.lock().calls.is_empty());
        assert_eq!(bridge.diagnostics().packets_ignored, 1);
    }

    #[test]
    fn replacing_processor_prepares_the_new_one() {
        let (mut bridge, old_log) = active_bridge(32, 2, 2);
        bridge.on_samples(&patterned(2, 40), 2, 48000);

        let (processor, new_log) = RecordingProcessor::boxed(1, 1);
        let previous = bridge.attach_processor(processor);
        assert!(previous.is_some());
        assert_eq!(old_log.lock().calls.last(), Some(&"stop"));
        assert_eq!(bridge.buffered_samples(), 0);

        bridge.on_samples(&patterned(2, 32), 2, 48000);

        assert_eq!(new_log.lock().prepared, vec![(48000.0, 32)]);
        assert_eq!(new_log.lock().blocks.len(), 1);
    }

    #[test]
    fn detach_makes_bridge_inert() {
        let (mut bridge, _log) = active_bridge(32, 2, 2);
        bridge.on_samples(&patterned(2, 40), 2, 48000);

        assert!(bridge.detach_processor().is_some());
        bridge.on_samples(&patterned(2, 40), 2, 48000);

        assert!(!bridge.is_active());
        assert!(bridge.configuration().is_none());
        assert_eq!(bridge.buffered_samples(), 0);
    }

    #[test]
    fn disabling_consumption_discards_buffered_audio() {
        let (mut bridge, _log) = active_bridge(32, 2, 2);
        bridge.on_samples(&patterned(2, 40), 2, 48000);
        assert_eq!(bridge.buffered_samples(), 16);

        bridge.set_consuming(false);

        assert!(!bridge.is_consuming());
        assert_eq!(bridge.buffered_samples(), 0);
    }

    #[test]
    fn meter_runs_only_once_consumption_is_on() {
        let shared = ProcessingBridge::shared(BridgeConfig::default()).unwrap();
        let (meter, levels) = MeterProcessor::new(2);
        shared.lock().attach_processor(Box::new(meter));
        assert!(!shared.lock().is_consuming());

        for _ in 0..4 {
            shared.lock().on_samples(&[0.5; 4096], 2, 48000);
        }
        assert_eq!(shared.lock().diagnostics().blocks_processed, 0);
        assert_eq!(shared.lock().diagnostics().packets_ignored, 4);

        shared.lock().set_consuming(true);
        for _ in 0..4 {
            shared.lock().on_samples(&[0.5; 4096], 2, 48000);
        }

        let bridge = shared.lock();
        assert_eq!(bridge.diagnostics().blocks_processed, 16);
        assert_eq!(bridge.output_channel(1).map(|ch| ch[0]), Some(0.5));
        assert_eq!(levels.levels().peak, 0.5);
    }

    #[test]
    fn processor_is_reachable_under_the_lock() {
        let (bridge, _log) = active_bridge(32, 3, 5);
        let shared: SharedBridge = Arc::new(Mutex::new(bridge));

        let mut guard = shared.lock();
        let processor = guard.processor_mut().unwrap();
        assert_eq!((processor.num_inputs(), processor.num_outputs()), (3, 5));
    }

    #[test]
    fn packets_arrive_through_consumer_trait() {
        let (bridge, log) = active_bridge(4, 2, 2);
        let shared = Arc::new(Mutex::new(bridge));
        let consumer: crate::traits::packet_consumer::SharedConsumer = shared.clone();

        let samples = patterned(2, 4);
        consumer.lock().on_packet(&AudioPacket {
            samples: &samples,
            channels: 2,
            sample_rate: 48000,
        });

        assert_eq!(log.lock().blocks.len(), 1);
        assert_eq!(shared.lock().buffered_samples(), 0);
    }
}
