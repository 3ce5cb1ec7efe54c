pub mod config;
pub mod dsp;
pub mod error;
pub mod stream;
#[cfg(feature = "wav")]
pub mod wav;

use crate::config::StackConfig;
use crate::dsp::Processor;
use crate::stream::Slice;
use num_complex::Complex64;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the chantstream version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Run a stack offline over `frames` zeroed stereo frames.
pub fn render_stack(config: &StackConfig, frames: usize) -> Result<Vec<f64>, error::DspError> {
    let mut stack = config.build()?;
    let mut slice = Slice::new(frames * stream::slice::STEREO);
    stack.process(&mut slice);
    Ok(slice.into_vec())
}

fn to_f32(samples: Vec<f64>) -> Vec<f32> {
    samples.into_iter().map(|s| s as f32).collect()
}

/// WASM-exposed: render a JSON stack description to interleaved stereo f32
/// samples. Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_stack_samples(config_json: &str, frames: usize) -> Result<Vec<f32>, JsValue> {
    let config = StackConfig::from_json(config_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let samples = render_stack(&config, frames).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(to_f32(samples))
}

/// WASM-exposed: same as [`render_stack_samples`] but takes the stack as a
/// plain JS object.
#[wasm_bindgen]
pub fn render_stack_value(config: JsValue, frames: usize) -> Result<Vec<f32>, JsValue> {
    let config: StackConfig =
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let samples = render_stack(&config, frames).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(to_f32(samples))
}

/// Magnitude spectrum of a real signal whose length is a power of two.
pub fn magnitudes(samples: &[f64]) -> Result<Vec<f64>, error::DspError> {
    let mut spectrum = vec![Complex64::default(); samples.len()];
    dsp::fft::fft_real(samples, &mut spectrum)?;
    Ok(dsp::fft::modulus(&spectrum))
}

/// WASM-exposed: FFT magnitudes of `samples`.
#[wasm_bindgen]
pub fn spectrum(samples: Vec<f64>) -> Result<Vec<f64>, JsValue> {
    magnitudes(&samples).map_err(|e| JsValue::from_str(&format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use crate::error::DspError;

    #[test]
    fn renders_a_stack_offline() {
        let config = StackConfig::from_json(
            r#"{ "sampleRate": 8000, "processors": [
                { "type": "pure-tone", "left": 1000, "right": 2000 },
                { "type": "volume", "volume": 0.5 }
            ] }"#,
        )
        .unwrap();
        let samples = render_stack(&config, 16).unwrap();
        assert_eq!(samples.len(), 32);
        for (frame, pair) in samples.chunks(2).enumerate() {
            let t = frame as f64 / 8000.0;
            let left = 0.5 * (2.0 * std::f64::consts::PI * 1000.0 * t).sin();
            assert!((pair[0] - left).abs() < 1e-9, "frame {frame}");
        }
    }

    #[test]
    fn render_rejects_bad_sample_rate() {
        let config = StackConfig {
            sample_rate: 0.0,
            processors: vec![ProcessorConfig::Volume { volume: 1.0 }],
            merge: Default::default(),
        };
        assert!(matches!(
            render_stack(&config, 4),
            Err(DspError::InvalidParameter { name: "sampleRate", .. })
        ));
    }

    #[test]
    fn magnitudes_find_the_peak_bin() {
        let n = 64;
        let x: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * 5.0 * i as f64 / n as f64).sin())
            .collect();
        let mags = magnitudes(&x).unwrap();
        let peak = mags[..n / 2]
            .iter()
            .enumerate()
            .fold((0, 0.0), |best, (i, &m)| if m > best.1 { (i, m) } else { best });
        assert_eq!(peak.0, 5);
        assert_eq!(magnitudes(&[0.0; 6]), Err(DspError::NotPowerOfTwo(6)));
    }

    #[test]
    fn version_is_set() {
        assert_eq!(core_version(), VERSION);
    }
}
