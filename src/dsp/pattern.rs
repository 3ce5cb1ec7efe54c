//! Stepped waveforms built by integrating cyclic per-sample deltas.

use crate::error::DspError;
use crate::stream::Slice;

use super::processor::Processor;

/// Integrates a repeating list of deltas, independently per channel.
///
/// A list `[0.1; 10]` followed by `[-1.0]` yields a sawtooth; runs of zeros
/// give staircases.
#[derive(Debug, Clone)]
pub struct TonePattern {
    left_steps: Vec<f64>,
    right_steps: Vec<f64>,
    left_index: usize,
    right_index: usize,
    left_value: f64,
    right_value: f64,
}

impl TonePattern {
    pub fn new(left_steps: Vec<f64>, right_steps: Vec<f64>) -> Result<Self, DspError> {
        if left_steps.is_empty() || right_steps.is_empty() {
            return Err(DspError::EmptyPattern);
        }
        Ok(TonePattern {
            left_steps,
            right_steps,
            left_index: 0,
            right_index: 0,
            left_value: 0.0,
            right_value: 0.0,
        })
    }

    /// The same delta list on both channels.
    pub fn symmetric(steps: Vec<f64>) -> Result<Self, DspError> {
        Self::new(steps.clone(), steps)
    }

    /// Current integrated value of each channel.
    pub fn value(&self) -> (f64, f64) {
        (self.left_value, self.right_value)
    }
}

impl Processor for TonePattern {
    fn process(&mut self, slice: &mut Slice) {
        for s in slice.iter_mut().step_by(2) {
            self.left_value += self.left_steps[self.left_index];
            self.left_index = (self.left_index + 1) % self.left_steps.len();
            *s = self.left_value;
        }
        for s in slice.iter_mut().skip(1).step_by(2) {
            self.right_value += self.right_steps[self.right_index];
            self.right_index = (self.right_index + 1) % self.right_steps.len();
            *s = self.right_value;
        }
    }
}

/// Expand alternating `delta, count` values into a flat delta list.
///
/// `[1.0, 5.0, 0.0, 5.0]` becomes five `1.0`s followed by five `0.0`s.
/// Counts are truncated toward zero; negative counts contribute nothing.
pub fn make_tone_pattern(pairs: &[f64]) -> Result<Vec<f64>, DspError> {
    if pairs.len() % 2 != 0 {
        return Err(DspError::UnpairedPattern(pairs.len()));
    }
    let mut out = Vec::with_capacity(pairs.len());
    for pair in pairs.chunks_exact(2) {
        let count = pair[1].max(0.0) as usize;
        out.extend(std::iter::repeat_n(pair[0], count));
    }
    Ok(out)
}

/// Repeat each step `factor` times, divided by `factor`.
///
/// The waveform keeps its shape and net slope but takes `factor` times as
/// many samples per cycle.
pub fn stretch_tone_pattern(factor: usize, steps: &[f64]) -> Vec<f64> {
    steps
        .iter()
        .flat_map(|&s| std::iter::repeat_n(s / factor as f64, factor))
        .collect()
}
