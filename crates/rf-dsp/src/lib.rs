//! rf-dsp: Processor graph and decimation for the ReelForge synth engine
//!
//! Polyphonic, block-based processing: every frame is a [`PolyFloat`]
//! carrying two stereo voices, and processors are wired through outputs
//! owned by a single [`OutputPool`].
//!
//! ## Modules
//! - `output` - Output buffers, inputs, and the arena that owns them
//! - `processor` - The `Processor` trait and shared `ProcessorState`
//! - `router` - Ordered sub-graphs of processors
//! - `graph` - Top-level graph with engine configuration
//! - `iir_halfband` - Polyphase allpass halfband decimator
//! - `fir_halfband` - Linear-phase 32-tap halfband decimator
//! - `decimator` - Multi-stage decimator that picks its stage count from rates
//! - `upsampler` - Sample-and-hold entry into an oversampled region
//! - `analysis` - FFT spectrum measurement of rendered lanes
//!
//! [`PolyFloat`]: rf_core::PolyFloat

#![feature(portable_simd)]

pub mod analysis;
pub mod decimator;
pub mod fir_halfband;
pub mod graph;
pub mod iir_halfband;
pub mod output;
pub mod processor;
pub mod router;
pub mod upsampler;

pub use analysis::{SpectrumAnalyzer, lane_signal};
pub use decimator::Decimator;
pub use fir_halfband::FirHalfbandDecimator;
pub use graph::SignalGraph;
pub use iir_halfband::IirHalfbandDecimator;
pub use output::{Input, Output, OutputId, OutputPool, ProcessorKey};
pub use processor::{Processor, ProcessorState};
pub use router::{ProcessorId, ProcessorRouter};
pub use upsampler::Upsampler;
