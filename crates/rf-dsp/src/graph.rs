//! SignalGraph: top-level owner of a processor graph
//!
//! Holds the output arena, the root router and the engine configuration.
//! The host fills [`SignalGraph::input`] each block, calls
//! [`SignalGraph::process`], and reads whichever outputs it cares about.
//!
//! Construction, wiring and rate changes are control-time operations and
//! return errors; `process` only checks the block size before running.

use rf_core::{EngineConfig, MAX_BUFFER_SIZE, PolyFloat, PolyMask, RfError, RfResult, SampleRate};

use crate::output::{OutputId, OutputPool};
use crate::processor::Processor;
use crate::router::{ProcessorId, ProcessorRouter};

pub struct SignalGraph {
    pool: OutputPool,
    router: ProcessorRouter,
    config: EngineConfig,
    /// Host-written audio at the engine rate
    input: OutputId,
}

impl SignalGraph {
    pub fn new(config: EngineConfig) -> RfResult<Self> {
        config.validate()?;

        let sample_rate = config.sample_rate.as_f64();
        let mut pool = OutputPool::new();
        let input = pool.allocate_external(MAX_BUFFER_SIZE, sample_rate);
        let mut router: ProcessorRouter = ProcessorRouter::new(&mut pool, 0, 0);
        router.set_sample_rate(sample_rate);

        log::info!(
            "SignalGraph: {} Hz, block {}, oversample {}x",
            config.sample_rate.as_u32(),
            config.block_size,
            config.oversample.factor()
        );

        Ok(Self {
            pool,
            router,
            config,
            input,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.router.sample_rate()
    }

    /// Output the host writes before each block
    #[inline]
    pub fn input(&self) -> OutputId {
        self.input
    }

    #[inline]
    pub fn pool(&self) -> &OutputPool {
        &self.pool
    }

    /// For building and wiring processors before they are added
    #[inline]
    pub fn pool_mut(&mut self) -> &mut OutputPool {
        &mut self.pool
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.router.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }

    /// Append a processor to the execution order
    pub fn add_processor<P: Processor + 'static>(&mut self, processor: P) -> ProcessorId {
        let name = processor.name();
        let id = self.router.add_processor(Box::new(processor));
        if let Some(processor) = self.router.processor(id) {
            processor.publish_sample_rate(&mut self.pool);
            log::debug!(
                "SignalGraph: added {name} as #{id} at {} Hz",
                processor.sample_rate()
            );
        }
        id
    }

    pub fn processor(&self, id: ProcessorId) -> Option<&dyn Processor> {
        self.router.processor(id).map(|p| &**p)
    }

    pub fn processor_mut(&mut self, id: ProcessorId) -> Option<&mut (dyn Processor + 'static)> {
        self.router.processor_mut(id).map(|p| &mut **p)
    }

    /// Copy `frames` into the graph input
    pub fn write_input(&mut self, frames: &[PolyFloat]) -> RfResult<()> {
        let capacity = MAX_BUFFER_SIZE;
        if frames.len() > capacity {
            return Err(RfError::BufferOverrun {
                requested: frames.len(),
                capacity,
            });
        }
        let input = self
            .pool
            .get_mut(self.input)
            .ok_or(RfError::UnknownOutput(self.input.index()))?;
        input.buffer_mut()[..frames.len()].copy_from_slice(frames);
        input.commit(frames.len());
        Ok(())
    }

    pub fn output_buffer(&self, id: OutputId) -> RfResult<&[PolyFloat]> {
        self.pool.try_buffer(id)
    }

    /// Change the engine rate, propagate it, and re-check every processor
    pub fn set_sample_rate(&mut self, sample_rate: SampleRate) -> RfResult<()> {
        let rate = sample_rate.as_f64();
        self.config.sample_rate = sample_rate;
        self.router.set_sample_rate(rate);
        if let Some(input) = self.pool.get_mut(self.input) {
            input.set_sample_rate(rate);
        }
        self.router.publish_sample_rate(&mut self.pool);

        match self.validate() {
            Ok(()) => {
                log::info!("SignalGraph: sample rate {} Hz", sample_rate.as_u32());
                Ok(())
            }
            Err(err) => {
                log::warn!("SignalGraph: sample rate {} Hz rejected: {err}", sample_rate.as_u32());
                Err(err)
            }
        }
    }

    pub fn validate(&self) -> RfResult<()> {
        self.router.validate(&self.pool)
    }

    /// Run one block of `num_samples` frames at the engine rate
    pub fn process(&mut self, num_samples: usize) -> RfResult<()> {
        if num_samples > MAX_BUFFER_SIZE {
            return Err(RfError::BufferOverrun {
                requested: num_samples,
                capacity: MAX_BUFFER_SIZE,
            });
        }
        self.router.process(&mut self.pool, num_samples);
        Ok(())
    }

    pub fn reset(&mut self, mask: PolyMask) {
        self.router.reset(mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upsampler::Upsampler;

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            block_size: 0,
            ..EngineConfig::default()
        };
        assert!(SignalGraph::new(config).is_err());
    }

    #[test]
    fn test_overrun_is_rejected_before_processing() {
        let mut graph = SignalGraph::new(EngineConfig::default()).unwrap();
        assert!(matches!(
            graph.process(MAX_BUFFER_SIZE + 1),
            Err(RfError::BufferOverrun { requested: 129, capacity: 128 })
        ));
        assert!(graph.write_input(&[PolyFloat::ZERO; MAX_BUFFER_SIZE + 1]).is_err());
        assert!(graph.process(MAX_BUFFER_SIZE).is_ok());
    }

    #[test]
    fn test_added_processor_inherits_rate() {
        let mut graph = SignalGraph::new(EngineConfig::default()).unwrap();
        let upsampler = Upsampler::new(graph.pool_mut(), 2).unwrap();
        let id = graph.add_processor(upsampler);

        let output = graph.processor(id).unwrap().output(0);
        assert_eq!(graph.pool().get(output).unwrap().sample_rate(), 96000.0);

        graph.set_sample_rate(SampleRate::Hz44100).unwrap();
        assert_eq!(graph.pool().get(output).unwrap().sample_rate(), 88200.0);
        assert_eq!(graph.pool().get(graph.input()).unwrap().sample_rate(), 44100.0);
        assert_eq!(graph.config().sample_rate, SampleRate::Hz44100);
    }

    #[test]
    fn test_input_round_trip() {
        let mut graph = SignalGraph::new(EngineConfig::default()).unwrap();
        let upsampler = {
            let mut upsampler = Upsampler::new(graph.pool_mut(), 2).unwrap();
            upsampler.plug(graph.input(), Upsampler::AUDIO).unwrap();
            upsampler
        };
        let id = graph.add_processor(upsampler);

        graph.write_input(&[PolyFloat::splat(0.25); 16]).unwrap();
        graph.process(16).unwrap();

        let output = graph.processor(id).unwrap().output(0);
        let buffer = graph.output_buffer(output).unwrap();
        assert!(buffer[..32].iter().all(|&s| s == PolyFloat::splat(0.25)));
    }
}
