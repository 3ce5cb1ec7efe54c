//! Radix-2 decimation-in-time FFT and its inverse.
//!
//! Only power-of-two lengths are supported. The recursion walks even and odd
//! sub-sequences through a stride instead of copying them.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::error::DspError;

fn check_len(n: usize) -> Result<(), DspError> {
    if n == 0 || !n.is_power_of_two() {
        return Err(DspError::NotPowerOfTwo(n));
    }
    Ok(())
}

fn check_buffer(needed: usize, got: usize) -> Result<(), DspError> {
    if got < needed {
        return Err(DspError::LengthMismatch { needed, got });
    }
    Ok(())
}

/// Cooley–Tukey recursion. `input` is read at `0, stride, 2 * stride, ...`;
/// the first `n` slots of `output` receive the spectrum.
fn ditfft(input: &[Complex64], output: &mut [Complex64], n: usize, stride: usize) {
    if n == 1 {
        output[0] = input[0];
        return;
    }
    let half = n / 2;
    let (even, odd) = output.split_at_mut(half);
    ditfft(input, even, half, 2 * stride);
    ditfft(&input[stride..], odd, half, 2 * stride);

    let partial = -2.0 * PI / n as f64;
    for k in 0..half {
        let twiddle = Complex64::from_polar(1.0, partial * k as f64) * odd[k];
        let e = even[k];
        even[k] = e + twiddle;
        odd[k] = e - twiddle;
    }
}

/// Forward transform of `n` values of `input` taken every `stride` elements.
pub fn fft_strided(input: &[Complex64], output: &mut [Complex64], n: usize, stride: usize) -> Result<(), DspError> {
    check_len(n)?;
    if stride == 0 {
        return Err(DspError::InvalidParameter {
            name: "stride",
            value: 0.0,
        });
    }
    check_buffer((n - 1) * stride + 1, input.len())?;
    check_buffer(n, output.len())?;
    ditfft(input, output, n, stride);
    Ok(())
}

/// Forward transform of the whole of `input`.
pub fn fft(input: &[Complex64], output: &mut [Complex64]) -> Result<(), DspError> {
    fft_strided(input, output, input.len(), 1)
}

/// Forward transform of a real signal.
pub fn fft_real(input: &[f64], output: &mut [Complex64]) -> Result<(), DspError> {
    fft(&complexify(input), output)
}

/// Inverse transform.
///
/// Feeds the spectrum to the forward transform in reversed order
/// (`i -> n - 1 - i`), which yields `n * x[k]` rotated by one bin of phase;
/// the rotation is undone and the result divided by `n`, so
/// `ifft(fft(x)) == x` for a spectrum laid out in the usual order.
pub fn ifft(input: &[Complex64], output: &mut [Complex64]) -> Result<(), DspError> {
    let n = input.len();
    check_len(n)?;
    check_buffer(n, output.len())?;
    let reversed: Vec<Complex64> = input.iter().rev().copied().collect();
    ditfft(&reversed, output, n, 1);

    let partial = -2.0 * PI / n as f64;
    let scale = n as f64;
    for (k, value) in output[..n].iter_mut().enumerate() {
        *value = *value * Complex64::from_polar(1.0, partial * k as f64) / scale;
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────

/// Promote real samples to complex with zero imaginary part.
pub fn complexify(real: &[f64]) -> Vec<Complex64> {
    real.iter().map(|&r| Complex64::new(r, 0.0)).collect()
}

/// Magnitude of every bin.
pub fn modulus(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum.iter().map(|c| c.norm()).collect()
}

/// Frequency at the centre of bucket `index` when `num_buckets` buckets
/// span the band from DC to Nyquist.
pub fn index_frequency(index: usize, sample_rate: f64, num_buckets: usize) -> f64 {
    index as f64 * (sample_rate / num_buckets as f64 / 2.0)
}

/// Inverse of [`index_frequency`], truncating to the bucket below.
pub fn frequency_index(freq: f64, sample_rate: f64, num_buckets: usize) -> usize {
    (freq / (sample_rate / num_buckets as f64 / 2.0)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9
    }

    /// Plain O(n^2) DFT to compare against.
    fn reference_dft(x: &[Complex64]) -> Vec<Complex64> {
        let n = x.len();
        (0..n)
            .map(|k| {
                x.iter()
                    .enumerate()
                    .map(|(j, &v)| v * Complex64::from_polar(1.0, -2.0 * PI * (j * k) as f64 / n as f64))
                    .sum()
            })
            .collect()
    }

    #[test]
    fn matches_reference_dft() {
        let x: Vec<Complex64> = (0..16)
            .map(|i| Complex64::new((i as f64 * 0.7).sin(), (i as f64 * 0.3).cos()))
            .collect();
        let mut out = vec![Complex64::default(); 16];
        fft(&x, &mut out).unwrap();
        for (a, b) in out.iter().zip(reference_dft(&x)) {
            assert!(close(*a, b), "{a} vs {b}");
        }
    }

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut out = vec![Complex64::default(); 8];
        fft_real(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], &mut out).unwrap();
        assert!(out.iter().all(|c| close(*c, Complex64::new(1.0, 0.0))));
    }

    #[test]
    fn pure_cosine_lands_in_its_bins() {
        let n = 32;
        let x: Vec<f64> = (0..n).map(|i| (2.0 * PI * 4.0 * i as f64 / n as f64).cos()).collect();
        let mut out = vec![Complex64::default(); n];
        fft_real(&x, &mut out).unwrap();
        let mags = modulus(&out);
        for (k, m) in mags.iter().enumerate() {
            let expected = if k == 4 || k == n - 4 { n as f64 / 2.0 } else { 0.0 };
            assert!((m - expected).abs() < 1e-9, "bin {k}: {m}");
        }
    }

    #[test]
    fn round_trip_restores_signal() {
        let x = [1.0, 2.0, 3.0, 4.0, 0.5, -1.0, -2.5, 0.25];
        let mut spectrum = vec![Complex64::default(); 8];
        let mut back = vec![Complex64::default(); 8];
        fft_real(&x, &mut spectrum).unwrap();
        ifft(&spectrum, &mut back).unwrap();
        for (orig, b) in x.iter().zip(&back) {
            assert!(close(Complex64::new(*orig, 0.0), *b), "{orig} vs {b}");
        }
    }

    #[test]
    fn round_trip_over_sizes() {
        for n in [1usize, 2, 4, 64, 256] {
            let x: Vec<Complex64> = (0..n)
                .map(|i| Complex64::new((i as f64).sqrt(), -(i as f64) * 0.1))
                .collect();
            let mut spectrum = vec![Complex64::default(); n];
            let mut back = vec![Complex64::default(); n];
            fft(&x, &mut spectrum).unwrap();
            ifft(&spectrum, &mut back).unwrap();
            for (a, b) in x.iter().zip(&back) {
                assert!(close(*a, *b), "n = {n}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn strided_transform_reads_every_other_value() {
        let interleaved: Vec<Complex64> = (0..16).map(|i| Complex64::new(i as f64, 0.0)).collect();
        let evens: Vec<Complex64> = interleaved.iter().step_by(2).copied().collect();
        let mut a = vec![Complex64::default(); 8];
        let mut b = vec![Complex64::default(); 8];
        fft_strided(&interleaved, &mut a, 8, 2).unwrap();
        fft(&evens, &mut b).unwrap();
        assert!(a.iter().zip(&b).all(|(x, y)| close(*x, *y)));
    }

    #[test]
    fn non_power_of_two_is_rejected() {
        let x = vec![Complex64::default(); 6];
        let mut out = vec![Complex64::default(); 6];
        assert_eq!(fft(&x, &mut out), Err(DspError::NotPowerOfTwo(6)));
        assert_eq!(ifft(&x, &mut out), Err(DspError::NotPowerOfTwo(6)));
        assert_eq!(fft(&[], &mut out), Err(DspError::NotPowerOfTwo(0)));
    }

    #[test]
    fn short_output_is_rejected() {
        let x = vec![Complex64::default(); 8];
        let mut out = vec![Complex64::default(); 4];
        assert_eq!(fft(&x, &mut out), Err(DspError::LengthMismatch { needed: 8, got: 4 }));
    }

    #[test]
    fn bucket_frequency_helpers_agree() {
        assert_eq!(index_frequency(10, 48000.0, 1024), 10.0 * 48000.0 / 1024.0 / 2.0);
        assert_eq!(frequency_index(index_frequency(37, 48000.0, 1024), 48000.0, 1024), 37);
    }
}
