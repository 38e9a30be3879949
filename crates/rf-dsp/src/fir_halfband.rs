//! FIR halfband decimator
//!
//! 32-tap symmetric (linear phase) lowpass evaluated only at the kept output
//! positions. Even and odd oversampled phases are packed side by side, so the
//! 32 taps fold into 16 [`PolyPacked`] coefficient pairs and each output frame
//! is a 16-term dot product.
//!
//! The last `NUM_TAPS / 2 - 1` packed frames of every block are carried in
//! `memory` so the first outputs of the next block see a continuous history.

use rf_core::{MAX_BUFFER_SIZE, PolyFloat, PolyMask, PolyPacked, RfResult};

use crate::output::OutputPool;
use crate::processor::{Processor, ProcessorState};

pub const NUM_TAPS: usize = 32;
const NUM_PAIRS: usize = NUM_TAPS / 2;
const MEMORY_SIZE: usize = NUM_PAIRS - 1;

/// Kaiser-windowed (beta 7) halfband, unity DC gain
#[rustfmt::skip]
const COEFFICIENTS: [f32; NUM_TAPS] = [
    -0.000_086_130_97, -0.000_296_851_04,  0.000_693_436_9,   0.001_361_622_2,
    -0.002_407_117_8,  -0.003_958_190_8,   0.006_170_985_5,   0.009_240_977,
    -0.013_427_331,    -0.019_104_818,     0.026_878_513,     0.037_858_17,
    -0.054_409_478,    -0.082_713_05,      0.145_558_61,      0.448_640_65,
     0.448_640_65,      0.145_558_61,     -0.082_713_05,     -0.054_409_478,
     0.037_858_17,      0.026_878_513,    -0.019_104_818,    -0.013_427_331,
     0.009_240_977,     0.006_170_985_5,  -0.003_958_190_8,  -0.002_407_117_8,
     0.001_361_622_2,   0.000_693_436_9,  -0.000_296_851_04, -0.000_086_130_97,
];

const fn fold_taps() -> [PolyPacked; NUM_PAIRS] {
    let mut taps = [PolyPacked::ZERO; NUM_PAIRS];
    let mut i = 0;
    while i < NUM_PAIRS {
        taps[i] = PolyPacked::pair(COEFFICIENTS[2 * i], COEFFICIENTS[2 * i + 1]);
        i += 1;
    }
    taps
}

static TAPS: [PolyPacked; NUM_PAIRS] = fold_taps();

/// Linear-phase halfband decimator
#[derive(Debug, Clone)]
pub struct FirHalfbandDecimator {
    state: ProcessorState,
    /// Oldest first
    memory: [PolyPacked; MEMORY_SIZE],
}

impl FirHalfbandDecimator {
    /// Oversampled audio in
    pub const AUDIO: usize = 0;
    pub const NUM_INPUTS: usize = 1;

    pub fn new(pool: &mut OutputPool) -> Self {
        Self::with_buffer_size(pool, MAX_BUFFER_SIZE)
    }

    /// Output room for `buffer_size` decimated frames
    pub fn with_buffer_size(pool: &mut OutputPool, buffer_size: usize) -> Self {
        Self {
            state: ProcessorState::new(pool, Self::NUM_INPUTS, 1, buffer_size),
            memory: [PolyPacked::ZERO; MEMORY_SIZE],
        }
    }

    /// Decimation delay in output frames for an impulse on an even input frame
    pub const fn even_phase_delay() -> usize {
        NUM_TAPS / 4 - 1
    }

    /// Packed frame `index` of the virtual stream `[memory | block]`
    #[inline]
    fn packed_at(&self, audio_in: &[PolyFloat], index: usize) -> PolyPacked {
        if index < MEMORY_SIZE {
            self.memory[index]
        } else {
            let frame = 2 * (index - MEMORY_SIZE);
            PolyPacked::consolidate(audio_in[frame], audio_in[frame + 1])
        }
    }

    /// Keep the newest `MEMORY_SIZE` packed frames for the next block
    fn save_memory(&mut self, audio_in: &[PolyFloat], num_samples: usize) {
        if num_samples >= MEMORY_SIZE {
            let start = num_samples - MEMORY_SIZE;
            for (i, slot) in self.memory.iter_mut().enumerate() {
                let frame = 2 * (start + i);
                *slot = PolyPacked::consolidate(audio_in[frame], audio_in[frame + 1]);
            }
        } else {
            self.memory.copy_within(num_samples.., 0);
            for i in 0..num_samples {
                self.memory[MEMORY_SIZE - num_samples + i] =
                    PolyPacked::consolidate(audio_in[2 * i], audio_in[2 * i + 1]);
            }
        }
    }
}

impl Processor for FirHalfbandDecimator {
    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn process(&mut self, pool: &mut OutputPool, num_samples: usize) {
        let source = self.state.input_source(Self::AUDIO);
        let dest = self.state.output_id(0);
        let Some((input, output)) = pool.split(source, dest) else {
            debug_assert!(false, "FirHalfbandDecimator: input aliases output");
            return;
        };

        let audio_in = input.buffer();
        debug_assert!(audio_in.len() >= 2 * num_samples);
        debug_assert!(output.buffer_size() >= num_samples);
        let n = num_samples
            .min(audio_in.len() / 2)
            .min(output.buffer_size());

        for (i, out) in output.buffer_mut()[..n].iter_mut().enumerate() {
            let mut sum = PolyPacked::ZERO;
            for (k, &tap) in TAPS.iter().enumerate() {
                sum += tap * self.packed_at(audio_in, i + k);
            }
            *out = sum.sum_split();
        }

        output.commit(n);
        self.save_memory(audio_in, n);
    }

    fn reset(&mut self, mask: PolyMask) {
        for slot in self.memory.iter_mut() {
            *slot = slot.clear_lanes(mask);
        }
    }

    fn clone_processor(&self, pool: &mut OutputPool) -> RfResult<Box<dyn Processor>> {
        Ok(Box::new(Self {
            state: self.state.clone_unwired(pool),
            memory: self.memory,
        }))
    }

    fn name(&self) -> &'static str {
        "FirHalfbandDecimator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputId;

    fn setup(frames: usize) -> (OutputPool, FirHalfbandDecimator, OutputId) {
        let mut pool = OutputPool::new();
        let source = pool.allocate_external(frames, 96000.0);
        let mut decimator = FirHalfbandDecimator::with_buffer_size(&mut pool, frames / 2);
        decimator.plug(source, FirHalfbandDecimator::AUDIO).unwrap();
        (pool, decimator, source)
    }

    #[test]
    fn test_coefficients_are_symmetric() {
        for i in 0..NUM_TAPS {
            assert_eq!(COEFFICIENTS[i], COEFFICIENTS[NUM_TAPS - 1 - i]);
        }
        let sum: f32 = COEFFICIENTS.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_taps_fold_pairs() {
        assert_eq!(TAPS[0].to_array()[0], COEFFICIENTS[0]);
        assert_eq!(TAPS[0].to_array()[1], COEFFICIENTS[1]);
        assert_eq!(TAPS[15].to_array()[7], COEFFICIENTS[31]);
    }

    #[test]
    fn test_dc_unity_after_history_fills() {
        let (mut pool, mut decimator, source) = setup(64);
        pool.get_mut(source).unwrap().buffer_mut().fill(PolyFloat::splat(1.0));

        decimator.process(&mut pool, 32);

        let out = pool.buffer(decimator.output(0));
        // history is zero for the first MEMORY_SIZE outputs
        assert!(out[0].max_abs() < 0.5);
        for sample in &out[MEMORY_SIZE..32] {
            assert!((sample.lane(0) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_short_blocks_shift_memory() {
        let (mut pool, mut decimator, source) = setup(64);
        for (i, s) in pool.get_mut(source).unwrap().buffer_mut().iter_mut().enumerate() {
            *s = PolyFloat::splat(i as f32);
        }

        decimator.process(&mut pool, 4);

        // newest four packed frames land at the end, the rest is still zero
        assert_eq!(decimator.memory[MEMORY_SIZE - 4].to_array()[0], 0.0);
        assert_eq!(decimator.memory[MEMORY_SIZE - 1].to_array()[..2], [6.0, 7.0]);
        assert!(decimator.memory[..MEMORY_SIZE - 4].iter().all(|&m| m == PolyPacked::ZERO));
    }

    #[test]
    fn test_masked_reset() {
        let (mut pool, mut decimator, source) = setup(64);
        pool.get_mut(source).unwrap().buffer_mut().fill(PolyFloat::splat(0.3));
        decimator.process(&mut pool, 32);

        decimator.reset(PolyMask::voice(1));

        for slot in &decimator.memory {
            let lanes = slot.to_array();
            assert!(lanes[..4].iter().all(|&v| v == 0.3));
            assert!(lanes[4..].iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let (mut pool, mut decimator, source) = setup(64);
        pool.get_mut(source).unwrap().buffer_mut().fill(PolyFloat::splat(0.3));
        decimator.process(&mut pool, 32);

        let copy = decimator.clone_processor(&mut pool).unwrap();
        assert_ne!(copy.output(0), decimator.output(0));
        assert!(!copy.input(FirHalfbandDecimator::AUDIO).unwrap().is_plugged());
        assert_eq!(copy.name(), "FirHalfbandDecimator");
    }
}
