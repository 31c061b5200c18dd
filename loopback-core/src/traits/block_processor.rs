/// A stateful block-based effect processor.
///
/// The bridge only drives this contract; it never copies or persists the
/// processor's internal state. Channel counts above 32 are clamped by the
/// caller.
pub trait BlockProcessor: Send {
    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    /// Suspend processing ahead of a reconfiguration.
    fn stop_processing(&mut self);

    fn prepare_for_processing(&mut self, sample_rate: f64, block_size: usize);

    fn start_processing(&mut self);

    /// Process one block. Every input and output slice is `block_size` long;
    /// outputs are overwritten.
    fn process_replacing(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], block_size: usize);
}
