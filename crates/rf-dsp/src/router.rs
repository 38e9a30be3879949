//! ProcessorRouter: a processor that owns and sequences child processors
//!
//! Children run in the order they were added. That order must already be a
//! topological order of the data flow; the router does no dependency
//! analysis. Disabled children are skipped entirely.
//!
//! The router is generic over its child type so a typed sub-graph (such as
//! the decimator's stage chain) is dispatched statically, while a
//! heterogeneous graph uses the default `Box<dyn Processor>`.

use rf_core::{PolyMask, RfError, RfResult};

use crate::output::{OutputId, OutputPool};
use crate::processor::{Processor, ProcessorState};

/// Index of a child inside its router
pub type ProcessorId = usize;

pub struct ProcessorRouter<P: Processor = Box<dyn Processor>> {
    state: ProcessorState,
    processors: Vec<P>,
}

impl<P: Processor> ProcessorRouter<P> {
    pub fn new(pool: &mut OutputPool, num_inputs: usize, num_outputs: usize) -> Self {
        Self::with_state(ProcessorState::new(pool, num_inputs, num_outputs, 0))
    }

    pub fn with_state(state: ProcessorState) -> Self {
        Self {
            state,
            processors: Vec::new(),
        }
    }

    /// Take ownership of `processor` and append it to the execution order
    pub fn add_processor(&mut self, mut processor: P) -> ProcessorId {
        processor.set_sample_rate(self.state.sample_rate());
        self.processors.push(processor);
        self.processors.len() - 1
    }

    /// Drop the most recently added child
    pub fn remove_last(&mut self) -> Option<P> {
        self.processors.pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    #[inline]
    pub fn processor(&self, id: ProcessorId) -> Option<&P> {
        self.processors.get(id)
    }

    #[inline]
    pub fn processor_mut(&mut self, id: ProcessorId) -> Option<&mut P> {
        self.processors.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.processors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut P> {
        self.processors.iter_mut()
    }
}

impl<P: Processor> Processor for ProcessorRouter<P> {
    fn state(&self) -> &ProcessorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    fn process(&mut self, pool: &mut OutputPool, num_samples: usize) {
        for processor in self.processors.iter_mut() {
            if processor.enabled() {
                let frames = num_samples * processor.oversample_amount();
                processor.process(pool, frames);
            }
        }
    }

    fn reset(&mut self, mask: PolyMask) {
        for processor in self.processors.iter_mut() {
            processor.reset(mask);
        }
    }

    fn clone_processor(&self, pool: &mut OutputPool) -> RfResult<Box<dyn Processor>> {
        Ok(Box::new(self.clone_router(pool)?))
    }

    fn name(&self) -> &'static str {
        "ProcessorRouter"
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.state.set_sample_rate(sample_rate);
        for processor in self.processors.iter_mut() {
            processor.set_sample_rate(sample_rate);
        }
    }

    fn publish_sample_rate(&self, pool: &mut OutputPool) {
        self.state.publish_sample_rate(pool);
        for processor in &self.processors {
            processor.publish_sample_rate(pool);
        }
    }

    fn validate(&self, pool: &OutputPool) -> RfResult<()> {
        for processor in &self.processors {
            processor.validate(pool)?;
        }
        Ok(())
    }
}

impl<P: Processor> ProcessorRouter<P> {
    /// Deep copy; links between children follow the copies, links to the
    /// outside are left unplugged
    pub fn clone_router(&self, pool: &mut OutputPool) -> RfResult<ProcessorRouter> {
        let mut router = ProcessorRouter::with_state(self.state.clone_unwired(pool));
        let mut remap: Vec<(OutputId, OutputId)> = Vec::new();

        for processor in &self.processors {
            let copy = processor.clone_processor(pool)?;
            remap.extend(
                processor
                    .state()
                    .outputs()
                    .iter()
                    .copied()
                    .zip(copy.state().outputs().iter().copied()),
            );
            router.processors.push(copy);
        }

        for (original, copy) in self.processors.iter().zip(router.processors.iter_mut()) {
            for (index, input) in original.state().inputs().iter().enumerate() {
                if let Some(&(_, cloned)) = remap.iter().find(|(old, _)| *old == input.source) {
                    copy.plug(cloned, index)?;
                }
            }
        }

        log::debug!(
            "ProcessorRouter: cloned {} children ({} internal links)",
            router.len(),
            remap.len()
        );
        Ok(router)
    }

    /// Child lookup that reports a missing id as an error
    pub fn try_processor_mut(&mut self, id: ProcessorId) -> RfResult<&mut P> {
        self.processors
            .get_mut(id)
            .ok_or_else(|| RfError::Dsp(format!("no processor with id {id}")))
    }
}
