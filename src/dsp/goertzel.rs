//! Goertzel filters — running power estimate of a single frequency bin.
//!
//! Cheaper than a full transform when only one frequency matters. The
//! output is normalized by the input energy and sample count, so a pure
//! sine on the bin settles near 1/2 regardless of its amplitude and
//! anything off the bin decays toward 0.

use std::f64::consts::PI;

use crate::error::DspError;
use crate::stream::Slice;

use super::processor::Processor;

/// A single-bin Goertzel power estimator.
#[derive(Debug, Clone)]
pub struct GoertzelFilter {
    freq: f64,
    sample_rate: f64,
    coeff: f64,

    s_prev: f64,
    s_prev2: f64,
    total_energy: f64,
    n: usize,
}

impl GoertzelFilter {
    pub fn new(freq: f64, sample_rate: f64) -> Self {
        let normalized = freq / sample_rate;
        GoertzelFilter {
            freq,
            sample_rate,
            coeff: 2.0 * (2.0 * PI * normalized).cos(),
            s_prev: 0.0,
            s_prev2: 0.0,
            total_energy: 0.0,
            n: 0,
        }
    }

    /// Clear the accumulators. The coefficient is kept.
    pub fn zero(&mut self) {
        self.s_prev = 0.0;
        self.s_prev2 = 0.0;
        self.total_energy = 0.0;
        self.n = 0;
    }

    /// Feed one sample and return the normalized bin power so far.
    pub fn calculate(&mut self, sample: f64) -> f64 {
        let s = sample + self.coeff * self.s_prev - self.s_prev2;
        self.s_prev2 = self.s_prev;
        self.s_prev = s;
        self.n += 1;
        let power =
            self.s_prev2 * self.s_prev2 + self.s_prev * self.s_prev - self.coeff * self.s_prev * self.s_prev2;
        self.total_energy += sample * sample;
        // Silence so far: divide by 1 instead of 0.
        let energy = if self.total_energy > 0.0 { self.total_energy } else { 1.0 };
        power / energy / self.n as f64
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn coeff(&self) -> f64 {
        self.coeff
    }

    /// Samples seen since the last [`zero`](Self::zero).
    pub fn count(&self) -> usize {
        self.n
    }
}

// ── CyclingGoertzelFilter ───────────────────────────────────

/// Several staggered Goertzel filters on the same frequency.
///
/// All instances see every sample; one is active and reported. Every
/// `reset_every` samples the active instance is zeroed and the next one,
/// already warmed up, takes over. Resetting a lone filter instead would
/// make its output jump while the normalizers restart from zero.
#[derive(Debug, Clone)]
pub struct CyclingGoertzelFilter {
    filters: Vec<GoertzelFilter>,
    reset_every: usize,
    active: usize,
    since_reset: usize,
}

impl CyclingGoertzelFilter {
    pub fn new(freq: f64, sample_rate: f64, reset_every: usize, num_instances: usize) -> Result<Self, DspError> {
        if num_instances == 0 {
            return Err(DspError::InvalidParameter {
                name: "num_instances",
                value: 0.0,
            });
        }
        if reset_every == 0 {
            return Err(DspError::InvalidParameter {
                name: "reset_every",
                value: 0.0,
            });
        }
        Ok(CyclingGoertzelFilter {
            filters: vec![GoertzelFilter::new(freq, sample_rate); num_instances],
            reset_every,
            active: 0,
            since_reset: 0,
        })
    }

    pub fn calculate(&mut self, sample: f64) -> f64 {
        self.since_reset += 1;
        let mut out = 0.0;
        for (i, filter) in self.filters.iter_mut().enumerate() {
            let value = filter.calculate(sample);
            if i == self.active {
                out = value;
            }
        }
        if self.since_reset >= self.reset_every {
            self.filters[self.active].zero();
            self.since_reset = 0;
            self.active = (self.active + 1) % self.filters.len();
        }
        out
    }

    /// Index of the instance currently being reported.
    pub fn active(&self) -> usize {
        self.active
    }

    pub fn num_instances(&self) -> usize {
        self.filters.len()
    }
}

// ── GoertzelVolume ──────────────────────────────────────────

/// Scales a stereo signal by how strongly it carries one frequency.
///
/// Each frame is mixed to mono, fed to a [`CyclingGoertzelFilter`], and both
/// channels are multiplied by the result.
#[derive(Debug, Clone)]
pub struct GoertzelVolume {
    filter: CyclingGoertzelFilter,
}

impl GoertzelVolume {
    pub fn new(freq: f64, sample_rate: f64, reset_every: usize, num_instances: usize) -> Result<Self, DspError> {
        Ok(GoertzelVolume {
            filter: CyclingGoertzelFilter::new(freq, sample_rate, reset_every, num_instances)?,
        })
    }
}

impl Processor for GoertzelVolume {
    fn process(&mut self, slice: &mut Slice) {
        for frame in slice.chunks_exact_mut(2) {
            let gain = self.filter.calculate((frame[0] + frame[1]) / 2.0);
            frame[0] *= gain;
            frame[1] *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::PureTone;

    const SR: f64 = 48000.0;

    fn sine(freq: f64, len: usize) -> Vec<f64> {
        (0..len).map(|i| (2.0 * PI * freq * i as f64 / SR).sin()).collect()
    }

    #[test]
    fn on_bin_sine_settles_near_half() {
        let mut g = GoertzelFilter::new(1000.0, SR);
        let mut last = 0.0;
        for x in sine(1000.0, 48000) {
            last = g.calculate(x);
        }
        assert!((last - 0.5).abs() < 0.01, "on-bin power {last}");
    }

    #[test]
    fn normalization_ignores_amplitude() {
        let mut loud = GoertzelFilter::new(1000.0, SR);
        let mut quiet = GoertzelFilter::new(1000.0, SR);
        let (mut a, mut b) = (0.0, 0.0);
        for x in sine(1000.0, 9600) {
            a = loud.calculate(x);
            b = quiet.calculate(x * 0.01);
        }
        assert!((a - b).abs() < 1e-6, "{a} vs {b}");
    }

    #[test]
    fn off_bin_sine_decays_to_zero() {
        let mut g = GoertzelFilter::new(1000.0, SR);
        let mut last = 1.0;
        for x in sine(5000.0, 48000) {
            last = g.calculate(x);
        }
        assert!(last < 1e-3, "off-bin power {last}");
    }

    #[test]
    fn silence_does_not_divide_by_zero() {
        let mut g = GoertzelFilter::new(440.0, SR);
        for _ in 0..100 {
            assert_eq!(g.calculate(0.0), 0.0);
        }
    }

    #[test]
    fn zero_keeps_coefficient() {
        let mut g = GoertzelFilter::new(440.0, SR);
        let coeff = g.coeff();
        for x in sine(440.0, 100) {
            g.calculate(x);
        }
        g.zero();
        assert_eq!(g.count(), 0);
        assert_eq!(g.coeff(), coeff);
    }

    fn largest_boundary_jump(num_instances: usize, reset_every: usize) -> f64 {
        let mut c = CyclingGoertzelFilter::new(1000.0, SR, reset_every, num_instances).unwrap();
        let values: Vec<f64> = sine(1000.0, reset_every * 10).into_iter().map(|x| c.calculate(x)).collect();
        (1..10)
            .map(|k| (values[k * reset_every] - values[k * reset_every - 1]).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn rotation_is_continuous_on_stationary_input() {
        for n in [2, 3, 4] {
            let jump = largest_boundary_jump(n, 9600);
            assert!(jump < 0.01, "{n} instances: boundary jump {jump}");
        }
    }

    #[test]
    fn lone_filter_jumps_when_reset() {
        let jump = largest_boundary_jump(1, 4800);
        assert!(jump > 0.1, "single instance jump {jump}");
    }

    #[test]
    fn active_index_rotates() {
        let mut c = CyclingGoertzelFilter::new(1000.0, SR, 3, 2).unwrap();
        assert_eq!(c.active(), 0);
        for _ in 0..3 {
            c.calculate(0.5);
        }
        assert_eq!(c.active(), 1);
        for _ in 0..3 {
            c.calculate(0.5);
        }
        assert_eq!(c.active(), 0);
    }

    #[test]
    fn bad_cycling_parameters_are_rejected() {
        assert!(CyclingGoertzelFilter::new(1000.0, SR, 0, 2).is_err());
        assert!(CyclingGoertzelFilter::new(1000.0, SR, 10, 0).is_err());
    }

    #[test]
    fn volume_passes_on_bin_and_mutes_off_bin() {
        let run = |freq: f64| {
            let mut tone = PureTone::new(freq, freq, SR);
            let mut slice = Slice::new(96000);
            tone.process(&mut slice);
            let input = slice.duplicate();
            GoertzelVolume::new(1000.0, SR, 4800, 3).unwrap().process(&mut slice);
            (input, slice)
        };

        let (input, output) = run(1000.0);
        let tail = 2 * 47000;
        for i in tail..input.len() {
            assert!((output.at(i) - 0.5 * input.at(i)).abs() < 0.01);
        }

        let (_, output) = run(5000.0);
        assert!(output[tail..].iter().all(|s| s.abs() < 1e-3));
    }
}
