//! Merge and Transistor — fan-in combinators that reconcile chunk sizes.
//!
//! Sources may deliver slices of any length. Each source gets a private
//! [`Buffer`]; every round the combinator drains the common length that all
//! buffers can supply, combines it sample by sample, and emits one slice.

use std::collections::VecDeque;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::error::StreamError;

use super::channel::{Stream, StreamSender};
use super::slice::{STEREO, Slice};
use super::spawn_task;

/// Default per-source buffer cap, in samples.
pub const DEFAULT_MAX_BUFFERED: usize = 1 << 20;

/// What happens to samples left in some buffers when the sources close
/// with unequal totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResiduePolicy {
    /// Sources that have run dry contribute zeros; all residue is flushed.
    #[default]
    ZeroPad,
    /// The output ends as soon as any closed source runs dry.
    Drop,
}

/// Tuning for [`merge_with`] and [`transistor_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub residue: ResiduePolicy,
    /// Fail the combined stream once any buffer holds more than this many
    /// samples. `None` lets buffers grow without limit.
    pub max_buffered: Option<usize>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            residue: ResiduePolicy::ZeroPad,
            max_buffered: Some(DEFAULT_MAX_BUFFERED),
        }
    }
}

// ── Buffer ──────────────────────────────────────────────────

/// A growable FIFO of samples not yet drained into an output frame.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    samples: VecDeque<f64>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, samples: &[f64]) {
        self.samples.extend(samples.iter().copied());
    }

    /// Remove exactly `n` samples, padding with zeros if fewer are buffered.
    pub fn drain(&mut self, n: usize) -> Vec<f64> {
        let available = n.min(self.samples.len());
        let mut out: Vec<f64> = self.samples.drain(..available).collect();
        out.resize(n, 0.0);
        out
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

// ── Junction ────────────────────────────────────────────────

/// Why a junction loop stopped early.
enum Halt {
    ConsumerGone,
    Fault(StreamError),
}

impl From<StreamError> for Halt {
    fn from(err: StreamError) -> Self {
        Halt::Fault(err)
    }
}

/// Shared buffering state behind Merge and Transistor.
struct Junction {
    sources: Vec<Stream>,
    buffers: Vec<Buffer>,
    open: Vec<bool>,
    options: MergeOptions,
    channels: Option<usize>,
}

impl Junction {
    fn new(sources: Vec<Stream>, options: MergeOptions) -> Self {
        let n = sources.len();
        Junction {
            sources,
            buffers: vec![Buffer::new(); n],
            open: vec![true; n],
            options,
            channels: None,
        }
    }

    /// Pull one slice from every source that is still open.
    /// Returns the number of sources that delivered data.
    fn receive_round(&mut self) -> Result<usize, StreamError> {
        let mut received = 0;
        for (i, source) in self.sources.iter_mut().enumerate() {
            if !self.open[i] {
                continue;
            }
            match source.next() {
                Some(Ok(slice)) => {
                    self.channels.get_or_insert(slice.channels());
                    self.buffers[i].write(&slice);
                    received += 1;
                    if let Some(cap) = self.options.max_buffered {
                        let buffered = self.buffers[i].len();
                        if buffered > cap {
                            return Err(StreamError::BufferOverflow {
                                input: i,
                                buffered,
                                cap,
                            });
                        }
                    }
                }
                Some(Err(err)) => return Err(err),
                None => self.open[i] = false,
            }
        }
        Ok(received)
    }

    /// Length every buffer can contribute right now, or `None` when the
    /// residue policy says the output is over.
    fn ready_len(&self) -> Option<usize> {
        let buffers = self.buffers.iter().zip(&self.open);
        match self.options.residue {
            ResiduePolicy::ZeroPad => Some(
                buffers
                    .filter(|(_, open)| **open)
                    .map(|(b, _)| b.len())
                    .min()
                    .unwrap_or(0),
            ),
            ResiduePolicy::Drop => {
                if buffers.clone().any(|(b, open)| !*open && b.is_empty()) {
                    None
                } else {
                    buffers.map(|(b, _)| b.len()).min()
                }
            }
        }
    }

    fn take_frame(&mut self, len: usize) -> Vec<Vec<f64>> {
        self.buffers.iter_mut().map(|b| b.drain(len)).collect()
    }

    fn emit(&self, tx: &StreamSender, samples: Vec<f64>) -> Result<(), Halt> {
        let channels = self.channels.unwrap_or(STEREO);
        tx.send(Slice::from_vec_with_channels(samples, channels))
            .map_err(|_| Halt::ConsumerGone)
    }

    fn discard_residue(&mut self) {
        let leftover: usize = self.buffers.iter().map(Buffer::len).sum();
        if leftover > 0 {
            warn!("dropping {leftover} unmatched samples at end of stream");
        }
        self.buffers.iter_mut().for_each(Buffer::clear);
    }

    fn run<F>(&mut self, tx: &StreamSender, combine: &mut F) -> Result<(), Halt>
    where
        F: FnMut(&[Vec<f64>]) -> Vec<f64>,
    {
        self.receive_round()?;
        loop {
            match self.ready_len() {
                None => {
                    self.discard_residue();
                    return Ok(());
                }
                Some(0) => {}
                Some(len) => {
                    let frame = self.take_frame(len);
                    self.emit(tx, combine(&frame[..]))?;
                }
            }
            if self.receive_round()? == 0 {
                break;
            }
        }

        match self.options.residue {
            ResiduePolicy::ZeroPad => {
                let len = self.buffers.iter().map(Buffer::len).max().unwrap_or(0);
                if len > 0 {
                    debug!("flushing {len} residue samples zero-padded");
                    let frame = self.take_frame(len);
                    self.emit(tx, combine(&frame[..]))?;
                }
            }
            ResiduePolicy::Drop => self.discard_residue(),
        }
        Ok(())
    }
}

fn spawn_junction<F>(name: &'static str, sources: Vec<Stream>, options: MergeOptions, mut combine: F) -> Stream
where
    F: FnMut(&[Vec<f64>]) -> Vec<f64> + Send + 'static,
{
    let (tx, out) = Stream::channel();
    spawn_task(name, move || {
        let mut junction = Junction::new(sources, options);
        match junction.run(&tx, &mut combine) {
            Ok(()) => debug!("{name} finished"),
            Err(Halt::ConsumerGone) => debug!("{name} stopped: consumer dropped"),
            Err(Halt::Fault(err)) => {
                error!("{name} failed: {err}");
                let _ = tx.fail(err);
            }
        }
    });
    out
}

// ── Combinators ─────────────────────────────────────────────

/// Average any number of streams sample by sample, with default options.
pub fn merge(sources: Vec<Stream>) -> Stream {
    merge_with(sources, MergeOptions::default())
}

/// Average `sources` sample by sample.
///
/// The output is the arithmetic mean over all sources, so merging copies of
/// one signal leaves its amplitude unchanged.
///
/// # Panics
/// If `sources` is empty.
pub fn merge_with(sources: Vec<Stream>, options: MergeOptions) -> Stream {
    assert!(!sources.is_empty(), "merge needs at least one source");
    let count = sources.len() as f64;
    spawn_junction("merge", sources, options, move |frame| {
        let len = frame[0].len();
        (0..len)
            .map(|i| frame.iter().map(|b| b[i]).sum::<f64>() / count)
            .collect()
    })
}

/// Combine `input` and `control` sample by sample through `f`, with default options.
pub fn transistor<F>(input: Stream, control: Stream, f: F) -> Stream
where
    F: FnMut(f64, f64) -> f64 + Send + 'static,
{
    transistor_with(input, control, f, MergeOptions::default())
}

/// Combine `input` and `control` sample by sample through `f(input, control)`.
///
/// Used for amplitude modulation and gating.
pub fn transistor_with<F>(input: Stream, control: Stream, mut f: F, options: MergeOptions) -> Stream
where
    F: FnMut(f64, f64) -> f64 + Send + 'static,
{
    spawn_junction("transistor", vec![input, control], options, move |frame| {
        frame[0]
            .iter()
            .zip(&frame[1])
            .map(|(&x, &c)| f(x, c))
            .collect()
    })
}
