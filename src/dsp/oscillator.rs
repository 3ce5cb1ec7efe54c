//! Phase-accumulator oscillators: pure stereo tones and harmonic tones with vibrato.

use std::f64::consts::PI;

use log::debug;

use crate::error::DspError;
use crate::stream::Slice;

use super::processor::Processor;

/// Headroom applied to the summed harmonic output.
const HEADROOM: f64 = 0.9;

/// Advance a phase accumulator, keeping it in `[0, 1)`.
#[inline]
fn advance(phase: f64, step: f64) -> f64 {
    (phase + step).fract()
}

// ── PureTone ────────────────────────────────────────────────

/// A sine with independent left and right frequencies.
///
/// Even sample indices carry the left channel, odd indices the right.
#[derive(Debug, Clone)]
pub struct PureTone {
    left_freq: f64,
    right_freq: f64,
    sample_rate: f64,
    step_l: f64,
    phase_l: f64,
    step_r: f64,
    phase_r: f64,
}

impl PureTone {
    pub fn new(left_freq: f64, right_freq: f64, sample_rate: f64) -> Self {
        let mut tone = PureTone {
            left_freq,
            right_freq,
            sample_rate,
            step_l: 0.0,
            phase_l: 0.0,
            step_r: 0.0,
            phase_r: 0.0,
        };
        tone.set_freq(left_freq, right_freq);
        tone
    }

    /// Retune both channels. Phase carries over, so there is no click.
    pub fn set_freq(&mut self, left_freq: f64, right_freq: f64) {
        self.left_freq = left_freq;
        self.right_freq = right_freq;
        self.step_l = left_freq / self.sample_rate;
        self.step_r = right_freq / self.sample_rate;
    }

    pub fn freq(&self) -> (f64, f64) {
        (self.left_freq, self.right_freq)
    }
}

impl Processor for PureTone {
    fn process(&mut self, slice: &mut Slice) {
        for s in slice.iter_mut().step_by(2) {
            *s = (2.0 * PI * self.phase_l).sin();
            self.phase_l = advance(self.phase_l, self.step_l);
        }
        for s in slice.iter_mut().skip(1).step_by(2) {
            *s = (2.0 * PI * self.phase_r).sin();
            self.phase_r = advance(self.phase_r, self.step_r);
        }
    }
}

// ── HarmonicTone ────────────────────────────────────────────

/// A fundamental plus `num_harmonics - 1` overtones with a shared vibrato.
///
/// Partial `j` runs at `freq * (j + 1) * distance^j` with weight
/// `vol_scale / (j + 1)`, where `vol_scale = 2^(N-1) / (2^N - 1)`.
/// The vibrato is a slow triangle added to every partial's phase step.
#[derive(Debug, Clone)]
pub struct HarmonicTone {
    freq: f64,
    sample_rate: f64,
    harmonic_distance: f64,
    vibrato_distance: f64,
    vibrato_rate: f64,

    step: Vec<f64>,
    phase: Vec<f64>,
    vol_scale: f64,
    vibrato_step: f64,
    vibrato_extent: f64,
    vibrato_pos: f64,
}

impl HarmonicTone {
    /// Build a tone with `num_harmonics` partials spaced by `distance`.
    ///
    /// `distance == 1.0` gives a plain harmonic series.
    pub fn new(freq: f64, sample_rate: f64, num_harmonics: usize, distance: f64) -> Result<Self, DspError> {
        if num_harmonics == 0 {
            return Err(DspError::NoHarmonics);
        }
        if sample_rate <= 0.0 {
            return Err(DspError::InvalidParameter {
                name: "sample_rate",
                value: sample_rate,
            });
        }
        let n = num_harmonics as i32;
        let mut tone = HarmonicTone {
            freq,
            sample_rate,
            harmonic_distance: distance,
            vibrato_distance: 0.0,
            vibrato_rate: 0.0,
            step: vec![0.0; num_harmonics],
            phase: vec![0.0; num_harmonics],
            vol_scale: 2f64.powi(n - 1) / (2f64.powi(n) - 1.0),
            vibrato_step: 0.0,
            vibrato_extent: 0.0,
            vibrato_pos: 0.0,
        };
        tone.set_freq(freq);
        Ok(tone)
    }

    pub fn set_freq(&mut self, freq: f64) {
        self.freq = freq;
        for (j, step) in self.step.iter_mut().enumerate() {
            *step = freq * (j as f64 + 1.0) * self.harmonic_distance.powi(j as i32) / self.sample_rate;
        }
        debug!("harmonic tone at {freq} Hz, phase steps {:?}", self.step);
    }

    /// Configure the vibrato sweep. `distance` is the peak-to-peak pitch
    /// offset in Hz, `rate` the time in seconds for one sweep across it.
    /// A distance of zero switches vibrato off.
    pub fn set_vibrato(&mut self, distance: f64, rate: f64) {
        self.vibrato_distance = distance;
        self.vibrato_rate = rate;
        self.vibrato_pos = 0.0;
        if distance == 0.0 || rate == 0.0 {
            self.vibrato_step = 0.0;
            self.vibrato_extent = 0.0;
            return;
        }
        self.vibrato_step = (distance / self.sample_rate) / (rate * self.sample_rate);
        self.vibrato_extent = (distance / self.sample_rate) / 2.0;
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    /// Configured vibrato `(distance, rate)`.
    pub fn vibrato(&self) -> (f64, f64) {
        (self.vibrato_distance, self.vibrato_rate)
    }

    pub fn num_harmonics(&self) -> usize {
        self.step.len()
    }

    pub fn vol_scale(&self) -> f64 {
        self.vol_scale
    }

    /// Largest magnitude the output can reach.
    pub fn peak_amplitude(&self) -> f64 {
        let weights: f64 = (1..=self.step.len()).map(|k| 1.0 / k as f64).sum();
        HEADROOM * self.vol_scale * weights
    }

    /// Next mono sample, advancing every partial and the vibrato by one frame.
    /// All partials see the same vibrato offset; it is not stepped per partial.
    pub fn next_sample(&mut self) -> f64 {
        let mut sum = 0.0;
        for (j, (phase, step)) in self.phase.iter_mut().zip(&self.step).enumerate() {
            sum += (2.0 * PI * *phase).sin() * (self.vol_scale / (j as f64 + 1.0));
            *phase = advance(*phase, step + self.vibrato_pos);
        }
        self.vibrato_pos += self.vibrato_step;
        let past_top = self.vibrato_step > 0.0 && self.vibrato_pos > self.vibrato_extent;
        let past_bottom = self.vibrato_step < 0.0 && self.vibrato_pos < self.vibrato_extent;
        if past_top || past_bottom {
            self.vibrato_step = -self.vibrato_step;
            self.vibrato_extent = -self.vibrato_extent;
        }
        sum * HEADROOM
    }
}

impl Processor for HarmonicTone {
    fn process(&mut self, slice: &mut Slice) {
        for frame in slice.chunks_mut(2) {
            let value = self.next_sample();
            frame.iter_mut().for_each(|s| *s = value);
        }
    }
}
