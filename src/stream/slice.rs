//! Slice — one chunk of interleaved multichannel audio.

use std::ops::{Deref, DerefMut};

/// Default channel layout: interleaved stereo pairs.
pub const STEREO: usize = 2;

/// A fixed-size chunk of interleaved `f64` samples.
///
/// Processors mutate slices in place. Sending a slice into a stream moves
/// it; the only way to keep a copy is [`Slice::duplicate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    samples: Vec<f64>,
    channels: usize,
}

impl Slice {
    /// A zeroed stereo slice of `len` samples.
    pub fn new(len: usize) -> Self {
        Self::with_channels(len, STEREO)
    }

    /// A zeroed slice of `len` samples laid out as `channels` interleaved channels.
    pub fn with_channels(len: usize, channels: usize) -> Self {
        assert!(channels > 0, "a slice needs at least one channel");
        Slice {
            samples: vec![0.0; len],
            channels,
        }
    }

    /// Wrap existing interleaved stereo samples.
    pub fn from_vec(samples: Vec<f64>) -> Self {
        Slice {
            samples,
            channels: STEREO,
        }
    }

    /// Wrap existing interleaved samples with an explicit channel count.
    pub fn from_vec_with_channels(samples: Vec<f64>, channels: usize) -> Self {
        assert!(channels > 0, "a slice needs at least one channel");
        Slice { samples, channels }
    }

    /// Number of samples (not frames).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of whole interleaved frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Sample at index `i`.
    #[inline]
    pub fn at(&self, i: usize) -> f64 {
        self.samples[i]
    }

    /// Overwrite the sample at index `i`.
    #[inline]
    pub fn set(&mut self, i: usize, value: f64) {
        self.samples[i] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    /// Copy into freshly allocated memory.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.samples
    }
}

impl Deref for Slice {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.samples
    }
}

impl DerefMut for Slice {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.samples
    }
}

impl From<Vec<f64>> for Slice {
    fn from(samples: Vec<f64>) -> Self {
        Slice::from_vec(samples)
    }
}
