//! Sample-and-hold upsampler
//!
//! Entry point of an oversampled region: every input frame is repeated
//! `factor` times. Imaging is left for the processors downstream (and the
//! matching [`crate::decimator::Decimator`]) to deal with.

use rf_core::{MAX_BUFFER_SIZE, MAX_OVERSAMPLE, PolyMask, RfError, RfResult};

use crate::output::OutputPool;
use crate::processor::{Processor, ProcessorState};

#[derive(Debug, Clone)]
pub struct Upsampler {
    state: ProcessorState,
    factor: usize,
}

impl Upsampler {
    /// Audio in at the base rate
    pub const AUDIO: usize = 0;
    pub const NUM_INPUTS: usize = 1;

    pub fn new(pool: &mut OutputPool, factor: usize) -> RfResult<Self> {
        if !factor.is_power_of_two() || factor > MAX_OVERSAMPLE {
            return Err(RfError::InvalidOversample(factor));
        }

        let mut state = ProcessorState::new(pool, Self::NUM_INPUTS, 1, MAX_BUFFER_SIZE * factor);
        state.set_oversample_amount(factor);
        log::debug!("Upsampler: {factor}x");
        Ok(Self { state, factor })
    }

    #[inline]
    pub fn factor(&self) -> usize {
        self.factor
    }
}

impl Processor for Upsampler {
    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    /// `num_samples` is counted at the oversampled rate
    fn process(&mut self, pool: &mut OutputPool, num_samples: usize) {
        let source = self.state.input_source(Self::AUDIO);
        let dest = self.state.output_id(0);
        let Some((input, output)) = pool.split(source, dest) else {
            debug_assert!(false, "Upsampler: input aliases output");
            return;
        };

        debug_assert!(num_samples % self.factor == 0);
        let frames = (num_samples / self.factor)
            .min(input.buffer_size())
            .min(output.buffer_size() / self.factor);

        for (chunk, &sample) in output.buffer_mut()[..frames * self.factor]
            .chunks_exact_mut(self.factor)
            .zip(input.buffer())
        {
            chunk.fill(sample);
        }

        output.commit(frames * self.factor);
    }

    fn reset(&mut self, _mask: PolyMask) {}

    fn clone_processor(&self, pool: &mut OutputPool) -> RfResult<Box<dyn Processor>> {
        Ok(Box::new(Self {
            state: self.state.clone_unwired(pool),
            factor: self.factor,
        }))
    }

    fn name(&self) -> &'static str {
        "Upsampler"
    }

    /// Fixed at construction
    fn set_oversample_amount(&mut self, _amount: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::PolyFloat;

    #[test]
    fn test_factor_validation() {
        let mut pool = OutputPool::new();
        assert!(Upsampler::new(&mut pool, 0).is_err());
        assert!(Upsampler::new(&mut pool, 3).is_err());
        assert!(matches!(
            Upsampler::new(&mut pool, 32),
            Err(RfError::InvalidOversample(32))
        ));
        assert_eq!(Upsampler::new(&mut pool, 1).unwrap().factor(), 1);
        assert_eq!(Upsampler::new(&mut pool, 16).unwrap().oversample_amount(), 16);
    }

    #[test]
    fn test_holds_each_frame() {
        let mut pool = OutputPool::new();
        let source = pool.allocate_external(MAX_BUFFER_SIZE, 48000.0);
        for (i, s) in pool.get_mut(source).unwrap().buffer_mut().iter_mut().enumerate() {
            *s = PolyFloat::splat(i as f32);
        }
        let mut upsampler = Upsampler::new(&mut pool, 4).unwrap();
        upsampler.plug(source, Upsampler::AUDIO).unwrap();

        upsampler.process(&mut pool, 32);

        let out = pool.buffer(upsampler.output(0));
        for (i, sample) in out[..32].iter().enumerate() {
            assert_eq!(*sample, PolyFloat::splat((i / 4) as f32));
        }
        assert_eq!(out[32], PolyFloat::ZERO);
    }

    #[test]
    fn test_rate_follows_factor() {
        let mut pool = OutputPool::new();
        let mut upsampler = Upsampler::new(&mut pool, 8).unwrap();
        upsampler.set_sample_rate(44100.0);
        upsampler.set_oversample_amount(2);
        assert_eq!(upsampler.sample_rate(), 352800.0);

        let copy = upsampler.clone_processor(&mut pool).unwrap();
        assert_eq!(copy.oversample_amount(), 8);
        assert!(!copy.input(Upsampler::AUDIO).unwrap().is_plugged());
    }
}
