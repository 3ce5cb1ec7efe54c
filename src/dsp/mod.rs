//! DSP — processors and numeric building blocks.
//!
//! Everything here runs synchronously inside whichever task owns it.
//! Oscillators, filters and the FFT can be used directly for offline
//! synthesis or analysis, or wrapped in a [`processor::Stack`] and applied
//! to a stream.

pub mod fft;
pub mod goertzel;
pub mod oscillator;
pub mod pattern;
pub mod processor;

pub use goertzel::{CyclingGoertzelFilter, GoertzelFilter, GoertzelVolume};
pub use oscillator::{HarmonicTone, PureTone};
pub use pattern::{TonePattern, make_tone_pattern, stretch_tone_pattern};
pub use processor::{FnProcessor, Processor, Stack, VolumeKnob, from_fn};
