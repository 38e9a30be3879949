//! Output buffers and the arena that owns them
//!
//! Processors never hold references to each other. Every [`Output`] of a
//! graph lives in one [`OutputPool`] and is addressed by a stable
//! [`OutputId`]; an [`Input`] is just the id of the output it reads.
//!
//! Id 0 is [`OutputPool::NULL`]: a silent buffer that unplugged inputs read.

use rf_core::{MAX_BUFFER_SIZE, MAX_OVERSAMPLE, PolyFloat, RfError, RfResult};

/// Stable handle of an [`Output`] inside an [`OutputPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(usize);

impl OutputId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Graph-unique identity of a processor, recorded as the owner of its outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessorKey(u32);

/// Reference from a processor to the upstream output it consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input {
    pub source: OutputId,
}

impl Input {
    #[inline]
    pub fn new(source: OutputId) -> Self {
        Self { source }
    }

    #[inline]
    pub fn is_plugged(&self) -> bool {
        self.source != OutputPool::NULL
    }
}

impl Default for Input {
    fn default() -> Self {
        Self {
            source: OutputPool::NULL,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Audio-rate buffer written by exactly one processor
#[derive(Debug, Clone)]
pub struct Output {
    buffer: Vec<PolyFloat>,
    owner: Option<ProcessorKey>,
    /// Rate of the frames in `buffer`, published by the owner
    sample_rate: f64,
    /// Last frame written, read by meters
    trigger_value: PolyFloat,
}

impl Output {
    fn new(owner: Option<ProcessorKey>, buffer_size: usize) -> Self {
        Self {
            buffer: vec![PolyFloat::ZERO; buffer_size],
            owner,
            sample_rate: 0.0,
            trigger_value: PolyFloat::ZERO,
        }
    }

    #[inline]
    pub fn buffer(&self) -> &[PolyFloat] {
        &self.buffer
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [PolyFloat] {
        &mut self.buffer
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn owner(&self) -> Option<ProcessorKey> {
        self.owner
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    #[inline]
    pub fn trigger_value(&self) -> PolyFloat {
        self.trigger_value
    }

    /// Record that `num_samples` frames were written this block
    #[inline]
    pub fn commit(&mut self, num_samples: usize) {
        if let Some(&last) = self.buffer[..num_samples.min(self.buffer.len())].last() {
            self.trigger_value = last;
        }
    }

    /// Grow the buffer. Allocates: graph construction only.
    pub fn ensure_buffer_size(&mut self, buffer_size: usize) {
        if self.buffer.len() < buffer_size {
            self.buffer.resize(buffer_size, PolyFloat::ZERO);
        }
    }

    pub fn clear(&mut self, num_samples: usize) {
        let n = num_samples.min(self.buffer.len());
        self.buffer[..n].fill(PolyFloat::ZERO);
        self.trigger_value = PolyFloat::ZERO;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Arena owning every output of one graph
#[derive(Debug, Clone)]
pub struct OutputPool {
    outputs: Vec<Output>,
    next_key: u32,
}

impl OutputPool {
    /// Silent output read by unplugged inputs
    pub const NULL: OutputId = OutputId(0);

    pub fn new() -> Self {
        Self {
            outputs: vec![Output::new(None, MAX_BUFFER_SIZE * MAX_OVERSAMPLE)],
            next_key: 0,
        }
    }

    /// Hand out a fresh processor identity
    pub fn register(&mut self) -> ProcessorKey {
        let key = ProcessorKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Create an output owned by `owner`
    pub fn allocate(&mut self, owner: ProcessorKey, buffer_size: usize) -> OutputId {
        self.push(Output::new(Some(owner), buffer_size))
    }

    /// Create an output written by host code rather than a processor
    pub fn allocate_external(&mut self, buffer_size: usize, sample_rate: f64) -> OutputId {
        let mut output = Output::new(None, buffer_size);
        output.set_sample_rate(sample_rate);
        self.push(output)
    }

    fn push(&mut self, output: Output) -> OutputId {
        let id = OutputId(self.outputs.len());
        self.outputs.push(output);
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: OutputId) -> bool {
        id.0 < self.outputs.len()
    }

    #[inline]
    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id.0)
    }

    /// Mutable access. The null output is never handed out for writing.
    #[inline]
    pub fn get_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        if id == Self::NULL {
            return None;
        }
        self.outputs.get_mut(id.0)
    }

    /// Buffer of `id`, or the null buffer for an unknown id
    #[inline]
    pub fn buffer(&self, id: OutputId) -> &[PolyFloat] {
        self.outputs
            .get(id.0)
            .unwrap_or(&self.outputs[Self::NULL.0])
            .buffer()
    }

    pub fn try_buffer(&self, id: OutputId) -> RfResult<&[PolyFloat]> {
        self.get(id)
            .map(Output::buffer)
            .ok_or(RfError::UnknownOutput(id.0))
    }

    /// Read `source` while writing `dest`
    ///
    /// `None` when either id is unknown, when they alias, or when `dest` is
    /// the null output.
    pub fn split(&mut self, source: OutputId, dest: OutputId) -> Option<(&Output, &mut Output)> {
        let (s, d) = (source.0, dest.0);
        let len = self.outputs.len();
        if s == d || s >= len || d >= len || dest == Self::NULL {
            return None;
        }
        if s < d {
            let (head, tail) = self.outputs.split_at_mut(d);
            Some((&head[s], &mut tail[0]))
        } else {
            let (head, tail) = self.outputs.split_at_mut(s);
            Some((&tail[0], &mut head[d]))
        }
    }

    /// Bit-exact copy of `num_samples` frames
    pub fn copy(&mut self, dest: OutputId, source: OutputId, num_samples: usize) {
        let Some((input, output)) = self.split(source, dest) else {
            debug_assert!(false, "copy between invalid outputs {source:?} -> {dest:?}");
            return;
        };
        debug_assert!(input.buffer_size() >= num_samples);
        debug_assert!(output.buffer_size() >= num_samples);
        let n = num_samples
            .min(input.buffer_size())
            .min(output.buffer_size());
        output.buffer[..n].copy_from_slice(&input.buffer[..n]);
        output.commit(n);
    }

    pub fn clear(&mut self, dest: OutputId, num_samples: usize) {
        if let Some(output) = self.get_mut(dest) {
            output.clear(num_samples);
        }
    }
}

impl Default for OutputPool {
    fn default() -> Self {
        Self::new()
    }
}
