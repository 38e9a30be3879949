//! rf-core: Shared types, constants and configuration for the ReelForge synth engine
//!
//! This crate provides the polyphonic lane types every processor works in,
//! the engine error type and the serde-backed engine configuration.

#![feature(portable_simd)]

mod config;
mod error;
mod sample;

pub use config::*;
pub use error::*;
pub use sample::*;

/// Largest block (in frames at the engine rate) a single `process()` call may request
pub const MAX_BUFFER_SIZE: usize = 128;

/// Largest oversampling factor any processor runs at
pub const MAX_OVERSAMPLE: usize = 16;

/// Halfband stages needed to undo [`MAX_OVERSAMPLE`]
pub const MAX_DECIMATION_STAGES: usize = 4;

/// Standard sample rate options
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum SampleRate {
    Hz44100 = 44100,
    Hz48000 = 48000,
    Hz88200 = 88200,
    Hz96000 = 96000,
    Hz176400 = 176400,
    Hz192000 = 192000,
    Hz352800 = 352800,
    Hz384000 = 384000,
}

impl SampleRate {
    #[inline]
    pub fn as_f64(self) -> f64 {
        self as u32 as f64
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::Hz48000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_limits_agree() {
        assert_eq!(1 << MAX_DECIMATION_STAGES, MAX_OVERSAMPLE);
        assert_eq!(SampleRate::Hz44100.as_f64(), 44100.0);
    }
}
