//! Stream — an ordered, closeable sequence of slices between tasks.
//!
//! Every stream is a rendezvous channel: a producer blocks in
//! [`StreamSender::send`] until a consumer takes the slice. Faults travel
//! in-band as `Err` items so they reach the final consumer in order with
//! the data that preceded them.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;

use crate::dsp::processor::Processor;
use crate::error::StreamError;

use super::slice::Slice;
use super::spawn_task;

/// Item carried by every stream channel.
pub(crate) type Packet = Result<Slice, StreamError>;

/// The producing end of a [`Stream`]. Dropping it closes the stream.
#[derive(Debug)]
pub struct StreamSender {
    tx: Sender<Packet>,
}

impl StreamSender {
    /// Hand `slice` to the consumer, blocking until it is accepted.
    ///
    /// Fails with [`StreamError::Closed`] once the consumer is gone.
    pub fn send(&self, slice: Slice) -> Result<(), StreamError> {
        self.tx.send(Ok(slice)).map_err(|_| StreamError::Closed)
    }

    /// Report a fault to the consumer. The stream should be dropped afterwards.
    pub fn fail(&self, err: StreamError) -> Result<(), StreamError> {
        self.tx.send(Err(err)).map_err(|_| StreamError::Closed)
    }

    pub(crate) fn forward(&self, packet: Packet) -> Result<(), StreamError> {
        self.tx.send(packet).map_err(|_| StreamError::Closed)
    }
}

/// The consuming end of a slice channel.
#[derive(Debug)]
pub struct Stream {
    rx: Receiver<Packet>,
    finished: bool,
}

impl Stream {
    /// Create a connected sender/stream pair.
    pub fn channel() -> (StreamSender, Stream) {
        let (tx, rx) = bounded(0);
        (
            StreamSender { tx },
            Stream {
                rx,
                finished: false,
            },
        )
    }

    /// Block for the next slice.
    ///
    /// Returns `Ok(None)` once at end of stream, then
    /// [`StreamError::ReadPastEnd`] on every later call.
    pub fn next_slice(&mut self) -> Result<Option<Slice>, StreamError> {
        if self.finished {
            return Err(StreamError::ReadPastEnd);
        }
        match self.rx.recv() {
            Ok(Ok(slice)) => Ok(Some(slice)),
            Ok(Err(err)) => {
                self.finished = true;
                Err(err)
            }
            Err(_) => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Whether end of stream (or a fault) has already been observed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // ── Sources ─────────────────────────────────────────────

    /// Stream a prepared list of slices from a producer task.
    pub fn from_slices(slices: Vec<Slice>) -> Stream {
        Self::spawn_source("slices", slices)
    }

    /// Stream slices pulled lazily from `source` on a producer task.
    pub fn spawn_source<I>(name: &str, source: I) -> Stream
    where
        I: IntoIterator<Item = Slice> + Send + 'static,
        I::IntoIter: Send,
    {
        let (tx, stream) = Self::channel();
        let label = name.to_string();
        spawn_task(name, move || {
            let mut sent = 0usize;
            for slice in source {
                if tx.send(slice).is_err() {
                    debug!("source `{label}` stopped: consumer dropped after {sent} slices");
                    return;
                }
                sent += 1;
            }
            debug!("source `{label}` finished after {sent} slices");
        });
        stream
    }

    /// Run `processor` over `count` zeroed stereo slices of `slice_len` samples.
    ///
    /// This is how oscillators become stream sources.
    pub fn generate<P>(mut processor: P, slice_len: usize, count: usize) -> Stream
    where
        P: Processor + 'static,
    {
        Self::spawn_source(
            "generate",
            (0..count).map(move |_| {
                let mut slice = Slice::new(slice_len);
                processor.process(&mut slice);
                slice
            }),
        )
    }

    /// `count` silent stereo slices of `slice_len` samples.
    pub fn silence(slice_len: usize, count: usize) -> Stream {
        Self::spawn_source("silence", (0..count).map(move |_| Slice::new(slice_len)))
    }

    // ── Sinks ───────────────────────────────────────────────

    /// Drain the stream into memory.
    pub fn collect_slices(self) -> Result<Vec<Slice>, StreamError> {
        self.collect()
    }

    /// Drain the stream, concatenating every sample.
    pub fn collect_samples(self) -> Result<Vec<f64>, StreamError> {
        let mut out = Vec::new();
        for slice in self {
            out.extend_from_slice(&slice?);
        }
        Ok(out)
    }

    /// Hand every slice to `sink` until end of stream. Returns the slice count.
    pub fn drain<F, E>(self, mut sink: F) -> Result<usize, E>
    where
        F: FnMut(Slice) -> Result<(), E>,
        E: From<StreamError>,
    {
        let mut count = 0;
        for slice in self {
            sink(slice?)?;
            count += 1;
        }
        Ok(count)
    }
}

impl Iterator for Stream {
    type Item = Result<Slice, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        self.next_slice().transpose()
    }
}

impl std::iter::FusedIterator for Stream {}

impl FromIterator<Slice> for Stream {
    fn from_iter<I: IntoIterator<Item = Slice>>(iter: I) -> Self {
        Stream::from_slices(iter.into_iter().collect())
    }
}
