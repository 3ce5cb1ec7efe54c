//! Serializable descriptions of processor stacks.
//!
//! A stack description is plain JSON so callers (and the WASM bindings)
//! can assemble effect chains without touching Rust types.

use serde::{Deserialize, Serialize};

use crate::dsp::{GoertzelVolume, HarmonicTone, Processor, PureTone, Stack, TonePattern, VolumeKnob};
use crate::dsp::pattern::{make_tone_pattern, stretch_tone_pattern};
use crate::error::{ConfigError, DspError};
use crate::stream::MergeOptions;

/// Vibrato settings for a harmonic tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VibratoConfig {
    /// Peak-to-peak pitch offset in Hz.
    pub distance: f64,
    /// Seconds per sweep.
    pub rate: f64,
}

/// One stage of a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProcessorConfig {
    Volume {
        volume: f64,
    },
    PureTone {
        left: f64,
        right: f64,
    },
    HarmonicTone {
        freq: f64,
        #[serde(default = "default_harmonics")]
        harmonics: usize,
        #[serde(default = "default_distance")]
        distance: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vibrato: Option<VibratoConfig>,
    },
    TonePattern {
        /// Alternating `delta, count` values.
        pairs: Vec<f64>,
        /// Optional right-channel pairs; the left pattern is mirrored if absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        right_pairs: Option<Vec<f64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stretch: Option<usize>,
    },
    GoertzelVolume {
        freq: f64,
        #[serde(rename = "resetEvery")]
        reset_every: usize,
        #[serde(default = "default_instances")]
        instances: usize,
    },
}

fn default_harmonics() -> usize {
    1
}

fn default_distance() -> f64 {
    1.0
}

fn default_instances() -> usize {
    2
}

impl ProcessorConfig {
    /// Instantiate this stage at `sample_rate`.
    pub fn build(&self, sample_rate: f64) -> Result<Box<dyn Processor>, DspError> {
        Ok(match self {
            ProcessorConfig::Volume { volume } => Box::new(VolumeKnob::new(*volume)),
            ProcessorConfig::PureTone { left, right } => Box::new(PureTone::new(*left, *right, sample_rate)),
            ProcessorConfig::HarmonicTone {
                freq,
                harmonics,
                distance,
                vibrato,
            } => {
                let mut tone = HarmonicTone::new(*freq, sample_rate, *harmonics, *distance)?;
                if let Some(v) = vibrato {
                    tone.set_vibrato(v.distance, v.rate);
                }
                Box::new(tone)
            }
            ProcessorConfig::TonePattern {
                pairs,
                right_pairs,
                stretch,
            } => {
                let expand = |pairs: &[f64]| -> Result<Vec<f64>, DspError> {
                    let steps = make_tone_pattern(pairs)?;
                    Ok(match stretch {
                        Some(x) if *x > 1 => stretch_tone_pattern(*x, &steps),
                        _ => steps,
                    })
                };
                let left = expand(pairs)?;
                let right = match right_pairs {
                    Some(r) => expand(r)?,
                    None => left.clone(),
                };
                Box::new(TonePattern::new(left, right)?)
            }
            ProcessorConfig::GoertzelVolume {
                freq,
                reset_every,
                instances,
            } => Box::new(GoertzelVolume::new(*freq, sample_rate, *reset_every, *instances)?),
        })
    }
}

/// A complete stack description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(rename = "sampleRate")]
    pub sample_rate: f64,
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
    /// Options for any merge or transistor stage the caller builds around the stack.
    #[serde(default)]
    pub merge: MergeOptions,
}

impl StackConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Instantiate every stage in order.
    pub fn build(&self) -> Result<Stack, DspError> {
        if self.sample_rate <= 0.0 {
            return Err(DspError::InvalidParameter {
                name: "sampleRate",
                value: self.sample_rate,
            });
        }
        let mut stack = Stack::new();
        for p in &self.processors {
            stack.push(p.build(self.sample_rate)?);
        }
        Ok(stack)
    }
}
