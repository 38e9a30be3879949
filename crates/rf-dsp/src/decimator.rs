//! Multi-stage decimator
//!
//! Brings an oversampled stream back down to the engine rate with a chain of
//! [`IirHalfbandDecimator`] stages, one halving per stage:
//!
//! ```text
//! input (rate * 2^k) -> stage 0 -> stage 1 -> ... -> stage k-1 -> output (rate)
//!                        cheap      cheap              sharp
//! ```
//!
//! The stage count `k` is derived every block from the input's published
//! rate and this processor's rate. Only the final stage pays for the sharp
//! coefficient table; earlier stages only need to protect the band that the
//! later stages will remove anyway.

use rf_core::{MAX_BUFFER_SIZE, MAX_DECIMATION_STAGES, PolyMask, RfError, RfResult};

use crate::iir_halfband::IirHalfbandDecimator;
use crate::output::OutputPool;
use crate::processor::{Processor, ProcessorState};
use crate::router::ProcessorRouter;

pub struct Decimator {
    state: ProcessorState,
    stages: ProcessorRouter<IirHalfbandDecimator>,
    max_stages: usize,
    /// Stage count the chain is configured for, `None` until derived
    active_stages: Option<usize>,
}

impl Decimator {
    /// Oversampled audio in
    pub const AUDIO: usize = 0;
    pub const NUM_INPUTS: usize = 1;

    pub fn new(pool: &mut OutputPool, max_stages: usize) -> RfResult<Self> {
        if max_stages == 0 || max_stages > MAX_DECIMATION_STAGES {
            return Err(RfError::InvalidStageCount(max_stages));
        }

        let state = ProcessorState::new(pool, Self::NUM_INPUTS, 1, MAX_BUFFER_SIZE);
        let mut stages: ProcessorRouter<IirHalfbandDecimator> = ProcessorRouter::new(pool, 0, 0);

        for i in 0..max_stages {
            let buffer_size = MAX_BUFFER_SIZE << (max_stages - 1 - i);
            let mut stage = IirHalfbandDecimator::with_buffer_size(pool, buffer_size);
            if i > 0 {
                let previous = stages
                    .processor(i - 1)
                    .map(|p| p.output(0))
                    .unwrap_or(OutputPool::NULL);
                stage.plug(previous, IirHalfbandDecimator::AUDIO)?;
            }
            stage.enable(false);
            stages.add_processor(stage);
        }

        log::debug!("Decimator: built {max_stages} halfband stages");

        Ok(Self {
            state,
            stages,
            max_stages,
            active_stages: None,
        })
    }

    /// Halvings needed to go from `input_rate` to `output_rate`
    pub fn stages_for_rates(input_rate: f64, output_rate: f64, max_stages: usize) -> RfResult<usize> {
        if input_rate <= 0.0 || !input_rate.is_finite() {
            return Err(RfError::InvalidSampleRate(input_rate));
        }
        if output_rate <= 0.0 || !output_rate.is_finite() {
            return Err(RfError::InvalidSampleRate(output_rate));
        }

        let mut num_stages = 0;
        let mut rate = input_rate;
        while rate > output_rate {
            num_stages += 1;
            rate /= 2.0;
        }

        if rate != output_rate {
            return Err(RfError::SampleRateRatio {
                input: input_rate,
                output: output_rate,
            });
        }
        if num_stages > max_stages {
            return Err(RfError::TooManyStages {
                required: num_stages,
                max: max_stages,
            });
        }
        Ok(num_stages)
    }

    #[inline]
    pub fn max_stages(&self) -> usize {
        self.max_stages
    }

    /// Stages in use after the last block, `None` before the first block
    #[inline]
    pub fn active_stages(&self) -> Option<usize> {
        self.active_stages
    }

    #[inline]
    pub fn stage(&self, index: usize) -> Option<&IirHalfbandDecimator> {
        self.stages.processor(index)
    }

    fn configure_stages(&mut self, num_stages: usize) {
        let sample_rate = self.state.sample_rate();
        for (i, stage) in self.stages.iter_mut().enumerate() {
            let active = i < num_stages;
            stage.enable(active);
            stage.set_sharp_cutoff(active && i == num_stages - 1);
            if active {
                stage.set_oversample_amount(1 << (num_stages - i - 1));
            }
            stage.set_sample_rate(sample_rate);
            stage.reset(PolyMask::FULL);
        }
        self.active_stages = Some(num_stages);
    }
}

impl Processor for Decimator {
    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn process(&mut self, pool: &mut OutputPool, num_samples: usize) {
        let source = self.state.input_source(Self::AUDIO);
        let dest = self.state.output_id(0);
        let input_rate = pool.get(source).map_or(0.0, |o| o.sample_rate());

        let num_stages =
            match Self::stages_for_rates(input_rate, self.state.sample_rate(), self.max_stages) {
                Ok(num_stages) => num_stages,
                // reported by validate(); an invalid ratio renders silence
                Err(_) => {
                    pool.clear(dest, num_samples);
                    return;
                }
            };

        if num_stages == 0 {
            self.active_stages = Some(0);
            pool.copy(dest, source, num_samples);
            return;
        }

        if self.active_stages != Some(num_stages) {
            self.configure_stages(num_stages);
        }

        if let Some(first) = self.stages.processor_mut(0) {
            if first.state().input_source(IirHalfbandDecimator::AUDIO) != source {
                // infallible: stage inputs are fixed at construction
                let _ = first.plug(source, IirHalfbandDecimator::AUDIO);
            }
        }

        self.stages.process(pool, num_samples);

        let last = self.stages.processor(num_stages - 1).map(|p| p.output(0));
        if let Some(last) = last {
            pool.copy(dest, last, num_samples);
        }
    }

    fn reset(&mut self, mask: PolyMask) {
        self.stages.reset(mask);
    }

    fn clone_processor(&self, _pool: &mut OutputPool) -> RfResult<Box<dyn Processor>> {
        Err(RfError::CloneUnsupported("Decimator"))
    }

    fn name(&self) -> &'static str {
        "Decimator"
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.state.set_sample_rate(sample_rate);
        self.stages.set_sample_rate(sample_rate);
        self.active_stages = None;
    }

    /// Oversampling is internal to the stage chain
    fn set_oversample_amount(&mut self, _amount: usize) {}

    fn publish_sample_rate(&self, pool: &mut OutputPool) {
        self.state.publish_sample_rate(pool);
        self.stages.publish_sample_rate(pool);
    }

    fn validate(&self, pool: &OutputPool) -> RfResult<()> {
        let source = self.state.input_source(Self::AUDIO);
        if source == OutputPool::NULL {
            return Ok(());
        }
        let input_rate = pool
            .get(source)
            .ok_or(RfError::UnknownOutput(source.index()))?
            .sample_rate();

        match Self::stages_for_rates(input_rate, self.state.sample_rate(), self.max_stages) {
            Ok(num_stages) => {
                log::debug!(
                    "Decimator: {input_rate} Hz -> {} Hz over {num_stages} stages",
                    self.state.sample_rate()
                );
                Ok(())
            }
            Err(err) => {
                log::warn!("Decimator: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::PolyFloat;

    #[test]
    fn test_stage_derivation() {
        assert_eq!(Decimator::stages_for_rates(44100.0, 44100.0, 3).unwrap(), 0);
        assert_eq!(Decimator::stages_for_rates(88200.0, 44100.0, 3).unwrap(), 1);
        assert_eq!(Decimator::stages_for_rates(352800.0, 44100.0, 3).unwrap(), 3);
    }

    #[test]
    fn test_stage_derivation_errors() {
        assert!(matches!(
            Decimator::stages_for_rates(96000.0, 44100.0, 4),
            Err(RfError::SampleRateRatio { .. })
        ));
        assert!(matches!(
            Decimator::stages_for_rates(705600.0, 44100.0, 3),
            Err(RfError::TooManyStages { required: 4, max: 3 })
        ));
        assert!(matches!(
            Decimator::stages_for_rates(0.0, 44100.0, 3),
            Err(RfError::InvalidSampleRate(_))
        ));
        assert!(Decimator::stages_for_rates(48000.0, f64::NAN, 3).is_err());
    }

    #[test]
    fn test_constructor_bounds() {
        let mut pool = OutputPool::new();
        assert!(Decimator::new(&mut pool, 0).is_err());
        assert!(Decimator::new(&mut pool, MAX_DECIMATION_STAGES + 1).is_err());
        let decimator = Decimator::new(&mut pool, 3).unwrap();
        assert_eq!(decimator.max_stages(), 3);
        assert_eq!(decimator.active_stages(), None);
    }

    #[test]
    fn test_stage_chain_wiring() {
        let mut pool = OutputPool::new();
        let decimator = Decimator::new(&mut pool, 3).unwrap();
        for i in 1..3 {
            let stage = decimator.stage(i).unwrap();
            let previous = decimator.stage(i - 1).unwrap();
            assert_eq!(
                stage.state().input_source(IirHalfbandDecimator::AUDIO),
                previous.output(0)
            );
        }
        let first = pool.get(decimator.stage(0).unwrap().output(0)).unwrap();
        assert_eq!(first.buffer_size(), MAX_BUFFER_SIZE * 4);
    }

    #[test]
    fn test_oversample_amount_is_ignored() {
        let mut pool = OutputPool::new();
        let mut decimator = Decimator::new(&mut pool, 2).unwrap();
        decimator.set_oversample_amount(8);
        assert_eq!(decimator.oversample_amount(), 1);
    }

    #[test]
    fn test_unplugged_input_gives_silence() {
        let mut pool = OutputPool::new();
        let mut decimator = Decimator::new(&mut pool, 2).unwrap();
        decimator.set_sample_rate(48000.0);
        pool.get_mut(decimator.output(0)).unwrap().buffer_mut().fill(PolyFloat::splat(1.0));

        decimator.process(&mut pool, 32);

        let out = pool.buffer(decimator.output(0));
        assert!(out[..32].iter().all(|&s| s == PolyFloat::ZERO));
        assert!(decimator.validate(&pool).is_ok());
    }

    #[test]
    fn test_clone_is_unsupported() {
        let mut pool = OutputPool::new();
        let decimator = Decimator::new(&mut pool, 2).unwrap();
        assert!(decimator.clone_processor(&mut pool).is_err());
    }
}
