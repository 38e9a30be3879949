//! Engine configuration
//!
//! Loaded once by the host before the graph is built. Every field has a
//! default so partial JSON documents are accepted.

use serde::{Deserialize, Serialize};

use crate::{MAX_BUFFER_SIZE, MAX_DECIMATION_STAGES, RfError, RfResult, SampleRate};

/// Oversampling factor for the internal processing region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OversampleFactor {
    /// No oversampling (1x)
    #[default]
    X1,
    /// 2x oversampling
    X2,
    /// 4x oversampling
    X4,
    /// 8x oversampling
    X8,
    /// 16x oversampling (maximum quality)
    X16,
}

impl OversampleFactor {
    pub fn factor(&self) -> usize {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }

    /// Halfband stages needed to come back down to the engine rate
    pub fn decimation_stages(&self) -> usize {
        self.factor().trailing_zeros() as usize
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output (host) sample rate
    pub sample_rate: SampleRate,
    /// Samples per audio callback at the output rate
    pub block_size: usize,
    /// Oversampling of the internal processing region
    pub oversample: OversampleFactor,
    /// Halfband stages each decimator allocates
    pub max_decimation_stages: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::default(),
            block_size: MAX_BUFFER_SIZE,
            oversample: OversampleFactor::X2,
            max_decimation_stages: MAX_DECIMATION_STAGES,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> RfResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        log::debug!(
            "EngineConfig: {:?} block={} oversample={}x stages={}",
            config.sample_rate,
            config.block_size,
            config.oversample.factor(),
            config.max_decimation_stages
        );
        Ok(config)
    }

    pub fn to_json(&self) -> RfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> RfResult<()> {
        if self.block_size == 0 || self.block_size > MAX_BUFFER_SIZE {
            return Err(RfError::Config(format!(
                "block_size {} outside 1..={}",
                self.block_size, MAX_BUFFER_SIZE
            )));
        }
        if self.max_decimation_stages == 0 || self.max_decimation_stages > MAX_DECIMATION_STAGES {
            return Err(RfError::InvalidStageCount(self.max_decimation_stages));
        }
        let required = self.oversample.decimation_stages();
        if required > self.max_decimation_stages {
            return Err(RfError::TooManyStages {
                required,
                max: self.max_decimation_stages,
            });
        }
        Ok(())
    }

    /// Rate of the oversampled processing region
    #[inline]
    pub fn internal_sample_rate(&self) -> f64 {
        self.sample_rate.as_f64() * self.oversample.factor() as f64
    }
}
