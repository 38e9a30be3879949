//! Error types for ReelForge

use thiserror::Error;

/// Core error type
///
/// Everything here is a configuration or wiring mistake. These are raised at
/// construction and control time; `process()` never returns them.
#[derive(Error, Debug)]
pub enum RfError {
    #[error("DSP error: {0}")]
    Dsp(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Sample rate ratio {input} -> {output} is not a power of two")]
    SampleRateRatio { input: f64, output: f64 },

    #[error("Decimation needs {required} stages, only {max} available")]
    TooManyStages { required: usize, max: usize },

    #[error("Invalid decimation stage count: {0}")]
    InvalidStageCount(usize),

    #[error("Invalid oversample factor: {0}")]
    InvalidOversample(usize),

    #[error("Buffer overrun: {requested} samples requested, capacity {capacity}")]
    BufferOverrun { requested: usize, capacity: usize },

    #[error("Invalid input index: {0}")]
    InvalidInput(usize),

    #[error("Invalid output index: {0}")]
    InvalidOutput(usize),

    #[error("Unknown output id: {0}")]
    UnknownOutput(usize),

    #[error("{0} cannot be cloned")]
    CloneUnsupported(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type RfResult<T> = Result<T, RfError>;
