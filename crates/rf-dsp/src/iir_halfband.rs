//! IIR halfband decimator
//!
//! Polyphase allpass halfband: the even and odd oversampled phases each run
//! through a chain of one-pole allpass sections (in the decimated domain),
//! and the two branches are averaged. Both branches share one
//! [`PolyPacked`] vector, so a single multiply-add per section covers every
//! lane and both phases.
//!
//! Two fixed designs:
//! - `TAPS_9`: 2 sections per branch, cheap, soft transition
//! - `TAPS_25`: 6 sections per branch, sharp transition, used on the final stage

use rf_core::{MAX_BUFFER_SIZE, PolyMask, PolyPacked, RfError, RfResult};

use crate::output::OutputPool;
use crate::processor::{Processor, ProcessorState};

pub const NUM_TAPS_9: usize = 2;
pub const NUM_TAPS_25: usize = 6;

/// `pair(delayed_branch, direct_branch)` per allpass section
pub static TAPS_9: [PolyPacked; NUM_TAPS_9] = [
    PolyPacked::pair(0.167_135_12, 0.041_393_885),
    PolyPacked::pair(0.742_130_03, 0.388_259_07),
];

pub static TAPS_25: [PolyPacked; NUM_TAPS_25] = [
    PolyPacked::pair(0.093_022_42, 0.024_388_384),
    PolyPacked::pair(0.312_318_06, 0.194_029_99),
    PolyPacked::pair(0.548_379_06, 0.433_855_68),
    PolyPacked::pair(0.737_198_53, 0.650_124_97),
    PolyPacked::pair(0.872_235, 0.810_418_67),
    PolyPacked::pair(0.975_497_8, 0.925_979_7),
];

/// Halves the rate of a 2x oversampled stream
#[derive(Debug, Clone)]
pub struct IirHalfbandDecimator {
    state: ProcessorState,
    sharp_cutoff: bool,
    in_memory: [PolyPacked; NUM_TAPS_25],
    out_memory: [PolyPacked; NUM_TAPS_25],
}

impl IirHalfbandDecimator {
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
            sharp_cutoff: false,
            in_memory: [PolyPacked::ZERO; NUM_TAPS_25],
            out_memory: [PolyPacked::ZERO; NUM_TAPS_25],
        }
    }

    /// Select the coefficient table used from the next block on
    #[inline]
    pub fn set_sharp_cutoff(&mut self, sharp_cutoff: bool) {
        self.sharp_cutoff = sharp_cutoff;
    }

    #[inline]
    pub fn sharp_cutoff(&self) -> bool {
        self.sharp_cutoff
    }

    #[inline]
    fn taps(&self) -> &'static [PolyPacked] {
        if self.sharp_cutoff { &TAPS_25 } else { &TAPS_9 }
    }
}

impl Processor for IirHalfbandDecimator {
    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn process(&mut self, pool: &mut OutputPool, num_samples: usize) {
        let source = self.state.input_source(Self::AUDIO);
        let dest = self.state.output_id(0);
        let taps = self.taps();
        let Some((input, output)) = pool.split(source, dest) else {
            debug_assert!(false, "IirHalfbandDecimator: input aliases output");
            return;
        };

        let audio_in = input.buffer();
        debug_assert!(audio_in.len() >= 2 * num_samples);
        debug_assert!(output.buffer_size() >= num_samples);
        let n = num_samples
            .min(audio_in.len() / 2)
            .min(output.buffer_size());

        for (out, frames) in output.buffer_mut()[..n]
            .iter_mut()
            .zip(audio_in.chunks_exact(2))
        {
            let mut value = PolyPacked::consolidate(frames[0], frames[1]);

            for ((&tap, in_mem), out_mem) in taps
                .iter()
                .zip(self.in_memory.iter_mut())
                .zip(self.out_memory.iter_mut())
            {
                let delta = value - *out_mem;
                let next = *in_mem + tap * delta;
                *in_mem = value;
                *out_mem = next;
                value = next;
            }

            *out = value.sum_split() * 0.5;
        }

        output.commit(n);
    }

    fn reset(&mut self, mask: PolyMask) {
        for (in_mem, out_mem) in self.in_memory.iter_mut().zip(self.out_memory.iter_mut()) {
            *in_mem = in_mem.clear_lanes(mask);
            *out_mem = out_mem.clear_lanes(mask);
        }
    }

    fn clone_processor(&self, _pool: &mut OutputPool) -> RfResult<Box<dyn Processor>> {
        Err(RfError::CloneUnsupported("IirHalfbandDecimator"))
    }

    fn name(&self) -> &'static str {
        "IirHalfbandDecimator"
    }
}
