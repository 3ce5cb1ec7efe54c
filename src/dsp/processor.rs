//! Processor and Stack — in-place slice transforms and their serial chains.

use crate::stream::{Slice, Stream, apply};

/// A stateful transform applied to one slice at a time, in arrival order.
///
/// A processor is owned by exactly one task at a time, so its state never
/// sees concurrent calls.
pub trait Processor: Send {
    fn process(&mut self, slice: &mut Slice);
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn process(&mut self, slice: &mut Slice) {
        (**self).process(slice)
    }
}

/// Adapts a closure into a [`Processor`].
pub struct FnProcessor<F> {
    f: F,
}

/// Wrap `f` as a processor.
pub fn from_fn<F>(f: F) -> FnProcessor<F>
where
    F: FnMut(&mut Slice) + Send,
{
    FnProcessor { f }
}

impl<F> Processor for FnProcessor<F>
where
    F: FnMut(&mut Slice) + Send,
{
    fn process(&mut self, slice: &mut Slice) {
        (self.f)(slice)
    }
}

// ── Stack ───────────────────────────────────────────────────

/// An ordered chain of processors.
///
/// [`Stack::apply`] runs each processor on its own task; using the stack
/// directly as a [`Processor`] runs the chain serially on the caller's
/// thread.
#[derive(Default)]
pub struct Stack {
    processors: Vec<Box<dyn Processor>>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn with<P: Processor + 'static>(mut self, processor: P) -> Self {
        self.push(processor);
        self
    }

    pub fn push<P: Processor + 'static>(&mut self, processor: P) {
        self.processors.push(Box::new(processor));
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Thread `stream` through every stage: stage `i`'s output feeds stage `i + 1`.
    /// An empty stack returns the stream unchanged.
    pub fn apply(self, stream: Stream) -> Stream {
        self.processors
            .into_iter()
            .fold(stream, |stream, mut p| apply(stream, move |s| p.process(s)))
    }
}

impl Processor for Stack {
    fn process(&mut self, slice: &mut Slice) {
        for p in &mut self.processors {
            p.process(slice);
        }
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack").field("stages", &self.processors.len()).finish()
    }
}

// ── VolumeKnob ──────────────────────────────────────────────

/// Scales every sample by a fixed gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeKnob {
    pub volume: f64,
}

impl VolumeKnob {
    pub fn new(volume: f64) -> Self {
        VolumeKnob { volume }
    }
}

impl Processor for VolumeKnob {
    fn process(&mut self, slice: &mut Slice) {
        for s in slice.iter_mut() {
            *s *= self.volume;
        }
    }
}
