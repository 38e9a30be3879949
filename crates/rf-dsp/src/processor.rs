//! Processor: the unit of computation in the signal graph
//!
//! A processor owns a fixed set of outputs in the [`OutputPool`] and reads a
//! fixed set of inputs. Once per block the owning router calls
//! [`Processor::process`], which must:
//! - read only its inputs' buffers
//! - write exactly `num_samples` frames to every owned output
//! - never allocate, lock or panic
//!
//! The sample rate of a processor is its base rate times its oversample
//! amount, so a router running at rate `r` hands an oversampled child
//! `num_samples * oversample_amount()` frames per block.

use rf_core::{PolyMask, RfError, RfResult};

use crate::output::{Input, OutputId, OutputPool, ProcessorKey};

/// State shared by every processor implementation
#[derive(Debug, Clone)]
pub struct ProcessorState {
    key: ProcessorKey,
    inputs: Vec<Input>,
    outputs: Vec<OutputId>,
    base_sample_rate: f64,
    oversample_amount: usize,
    enabled: bool,
}

impl ProcessorState {
    /// Register a processor and allocate its outputs
    pub fn new(
        pool: &mut OutputPool,
        num_inputs: usize,
        num_outputs: usize,
        buffer_size: usize,
    ) -> Self {
        let key = pool.register();
        let outputs = (0..num_outputs)
            .map(|_| pool.allocate(key, buffer_size))
            .collect();
        Self {
            key,
            inputs: vec![Input::default(); num_inputs],
            outputs,
            base_sample_rate: 0.0,
            oversample_amount: 1,
            enabled: true,
        }
    }

    /// Same shape and settings, fresh outputs, wired to nothing
    pub fn clone_unwired(&self, pool: &mut OutputPool) -> Self {
        let key = pool.register();
        let outputs = self
            .outputs
            .iter()
            .map(|&id| {
                let size = pool.get(id).map_or(0, |o| o.buffer_size());
                pool.allocate(key, size)
            })
            .collect();
        Self {
            key,
            inputs: vec![Input::default(); self.inputs.len()],
            outputs,
            base_sample_rate: self.base_sample_rate,
            oversample_amount: self.oversample_amount,
            enabled: self.enabled,
        }
    }

    #[inline]
    pub fn key(&self) -> ProcessorKey {
        self.key
    }

    #[inline]
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    #[inline]
    pub fn inputs_mut(&mut self) -> &mut [Input] {
        &mut self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[OutputId] {
        &self.outputs
    }

    /// Source of input `index`; null when out of range
    #[inline]
    pub fn input_source(&self, index: usize) -> OutputId {
        self.inputs
            .get(index)
            .map_or(OutputPool::NULL, |input| input.source)
    }

    /// Output `index`; null when out of range
    #[inline]
    pub fn output_id(&self, index: usize) -> OutputId {
        self.outputs.get(index).copied().unwrap_or(OutputPool::NULL)
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.base_sample_rate * self.oversample_amount as f64
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.base_sample_rate = sample_rate;
    }

    #[inline]
    pub fn oversample_amount(&self) -> usize {
        self.oversample_amount
    }

    #[inline]
    pub fn set_oversample_amount(&mut self, amount: usize) {
        self.oversample_amount = amount.max(1);
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_input(&mut self, index: usize, input: Input) -> RfResult<()> {
        let slot = self
            .inputs
            .get_mut(index)
            .ok_or(RfError::InvalidInput(index))?;
        *slot = input;
        Ok(())
    }

    pub fn set_output(&mut self, index: usize, output: OutputId) -> RfResult<()> {
        let slot = self
            .outputs
            .get_mut(index)
            .ok_or(RfError::InvalidOutput(index))?;
        *slot = output;
        Ok(())
    }

    /// Stamp the effective rate on every owned output
    pub fn publish_sample_rate(&self, pool: &mut OutputPool) {
        let rate = self.sample_rate();
        for &id in &self.outputs {
            if let Some(output) = pool.get_mut(id) {
                output.set_sample_rate(rate);
            }
        }
    }
}

/// Trait for all graph processors
pub trait Processor: Send {
    fn state(&self) -> &ProcessorState;

    fn state_mut(&mut self) -> &mut ProcessorState;

    /// Produce `num_samples` frames on every owned output
    fn process(&mut self, pool: &mut OutputPool, num_samples: usize);

    /// Reinitialise state for the lanes in `mask`, leave other lanes running
    fn reset(&mut self, mask: PolyMask);

    /// Independent copy with fresh outputs and every input unplugged
    fn clone_processor(&self, pool: &mut OutputPool) -> RfResult<Box<dyn Processor>>;

    /// Human-readable name for logs
    fn name(&self) -> &'static str {
        "Processor"
    }

    fn sample_rate(&self) -> f64 {
        self.state().sample_rate()
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.state_mut().set_sample_rate(sample_rate);
    }

    fn oversample_amount(&self) -> usize {
        self.state().oversample_amount()
    }

    fn set_oversample_amount(&mut self, amount: usize) {
        self.state_mut().set_oversample_amount(amount);
    }

    fn enabled(&self) -> bool {
        self.state().enabled()
    }

    fn enable(&mut self, enabled: bool) {
        self.state_mut().enable(enabled);
    }

    /// Read input `index` from `source`
    fn plug(&mut self, source: OutputId, index: usize) -> RfResult<()> {
        self.state_mut().set_input(index, Input::new(source))
    }

    /// Share another processor's input wiring
    fn use_input(&mut self, input: Input, index: usize) -> RfResult<()> {
        self.state_mut().set_input(index, input)
    }

    /// Write output `index` into an existing output instead of an owned one
    fn use_output(&mut self, output: OutputId, index: usize) -> RfResult<()> {
        self.state_mut().set_output(index, output)
    }

    fn input(&self, index: usize) -> Option<Input> {
        self.state().inputs().get(index).copied()
    }

    fn output(&self, index: usize) -> OutputId {
        self.state().output_id(index)
    }

    fn publish_sample_rate(&self, pool: &mut OutputPool) {
        self.state().publish_sample_rate(pool);
    }

    /// Check rates and wiring against the current pool. Control time only.
    fn validate(&self, _pool: &OutputPool) -> RfResult<()> {
        Ok(())
    }
}

impl Processor for Box<dyn Processor> {
    fn state(&self) -> &ProcessorState {
        (**self).state()
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        (**self).state_mut()
    }

    #[inline]
    fn process(&mut self, pool: &mut OutputPool, num_samples: usize) {
        (**self).process(pool, num_samples)
    }

    fn reset(&mut self, mask: PolyMask) {
        (**self).reset(mask)
    }

    fn clone_processor(&self, pool: &mut OutputPool) -> RfResult<Box<dyn Processor>> {
        (**self).clone_processor(pool)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn sample_rate(&self) -> f64 {
        (**self).sample_rate()
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        (**self).set_sample_rate(sample_rate)
    }

    fn oversample_amount(&self) -> usize {
        (**self).oversample_amount()
    }

    fn set_oversample_amount(&mut self, amount: usize) {
        (**self).set_oversample_amount(amount)
    }

    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    fn enable(&mut self, enabled: bool) {
        (**self).enable(enabled)
    }

    fn plug(&mut self, source: OutputId, index: usize) -> RfResult<()> {
        (**self).plug(source, index)
    }

    fn use_input(&mut self, input: Input, index: usize) -> RfResult<()> {
        (**self).use_input(input, index)
    }

    fn use_output(&mut self, output: OutputId, index: usize) -> RfResult<()> {
        (**self).use_output(output, index)
    }

    fn input(&self, index: usize) -> Option<Input> {
        (**self).input(index)
    }

    fn output(&self, index: usize) -> OutputId {
        (**self).output(index)
    }

    fn publish_sample_rate(&self, pool: &mut OutputPool) {
        (**self).publish_sample_rate(pool)
    }

    fn validate(&self, pool: &OutputPool) -> RfResult<()> {
        (**self).validate(pool)
    }
}
