//! DSP primitives the presets are assembled from.
//!
//! Filtering is done with biquad Butterworth sections run forward and
//! backward (zero-phase, matching the reference pipeline's filtfilt
//! behavior).  Spectral shaping uses rustfft.  All functions take and
//! return plain `Vec<f32>` channels; [`crate::preset`] owns the ordering
//! and the parameter table.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use rand::Rng;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::AudioError;
use crate::resample::resample;

/// Section Q values for a 2nd / 4th order Butterworth cascade.
fn butterworth_sections(order: usize) -> &'static [f32] {
    match order {
        4 => &[0.541_196_1, 1.306_563_0],
        // Everything else gets a single standard section.
        _ => &[std::f32::consts::FRAC_1_SQRT_2],
    }
}

fn run_cascade(samples: &mut [f32], filter_type: Type<f32>, sample_rate: u32, cutoff_hz: f32, order: usize) -> Result<(), AudioError> {
    for &q in butterworth_sections(order) {
        let coeffs =
            Coefficients::<f32>::from_params(filter_type, (sample_rate as f32).hz(), cutoff_hz.hz(), q)
                .map_err(|e| AudioError::Filter(format!("{e:?}")))?;
        let mut section = DirectForm2Transposed::<f32>::new(coeffs);
        for s in samples.iter_mut() {
            *s = section.run(*s);
        }
    }
    Ok(())
}

fn zero_phase(samples: &[f32], filter_type: Type<f32>, sample_rate: u32, cutoff_hz: f32, order: usize) -> Result<Vec<f32>, AudioError> {
    let mut out = samples.to_vec();
    run_cascade(&mut out, filter_type, sample_rate, cutoff_hz, order)?;
    out.reverse();
    run_cascade(&mut out, filter_type, sample_rate, cutoff_hz, order)?;
    out.reverse();
    Ok(out)
}

/// Zero-phase Butterworth low-pass.
pub fn low_pass(samples: &[f32], sample_rate: u32, cutoff_hz: f32, order: usize) -> Result<Vec<f32>, AudioError> {
    zero_phase(samples, Type::LowPass, sample_rate, cutoff_hz, order)
}

/// Zero-phase Butterworth high-pass.
pub fn high_pass(samples: &[f32], sample_rate: u32, cutoff_hz: f32, order: usize) -> Result<Vec<f32>, AudioError> {
    zero_phase(samples, Type::HighPass, sample_rate, cutoff_hz, order)
}

/// First-order pre-emphasis: `y[n] = x[n] - coef * x[n-1]`.
pub fn pre_emphasis(samples: &[f32], coef: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len());
    let mut prev = 0.0f32;
    for &s in samples {
        out.push(s - coef * prev);
        prev = s;
    }
    out
}

/// Hyperbolic-tangent saturation: `tanh(x * drive) * gain`.
pub fn soft_clip(samples: &[f32], drive: f32, gain: f32) -> Vec<f32> {
    samples.iter().map(|&s| (s * drive).tanh() * gain).collect()
}

/// Logarithmic compression: `sign(x) * ln(1 + factor * |x|) / factor`.
pub fn log_compress(samples: &[f32], factor: f32) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| s.signum() * (s.abs() * factor).ln_1p() / factor)
        .collect()
}

/// Scale so the peak hits 1.0.  Silence passes through untouched.
pub fn normalize_peak(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return samples.to_vec();
    }
    samples.iter().map(|&s| s / peak).collect()
}

/// Mix in Gaussian noise: `y = x + noise(sigma) * mix`.
///
/// Samples are drawn with the Box-Muller transform over the thread RNG.
pub fn add_noise(samples: &[f32], sigma: f32, mix: f32) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    samples
        .iter()
        .map(|&s| {
            let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
            let u2: f32 = rng.gen();
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
            s + z * sigma * mix
        })
        .collect()
}

/// Circular delay by `offset` frames (the spatial channel offset).
pub fn rotate_delay(samples: &[f32], offset: usize) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let offset = offset % samples.len();
    let mut out = samples.to_vec();
    out.rotate_right(offset);
    out
}

/// Boost `low_hz..=high_hz` by `gain` in the frequency domain
/// (forward FFT, scale band bins on both spectrum halves, inverse FFT).
pub fn band_boost(samples: &[f32], sample_rate: u32, low_hz: f32, high_hz: f32, gain: f32) -> Vec<f32> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut spectrum: Vec<Complex<f32>> =
        samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    forward.process(&mut spectrum);

    let bin_hz = sample_rate as f32 / n as f32;
    for (k, bin) in spectrum.iter_mut().enumerate() {
        // Mirror the negative-frequency half so the inverse stays real.
        let freq = bin_hz * k.min(n - k) as f32;
        if freq >= low_hz && freq <= high_hz {
            *bin *= gain;
        }
    }

    inverse.process(&mut spectrum);
    // rustfft leaves the inverse unnormalized.
    spectrum.iter().map(|c| c.re / n as f32).collect()
}

/// Resample-based pitch shift preserving the input length.
///
/// Shifting down stretches the signal, so the result is truncated (or
/// zero-padded) back to the source frame count for blending.
pub fn pitch_shift(samples: &[f32], sample_rate: u32, semitones: f32) -> Result<Vec<f32>, AudioError> {
    let ratio = 2f64.powf(-(semitones as f64) / 12.0);
    let target_rate = (sample_rate as f64 * ratio).round() as u32;
    let mut shifted = resample(samples, sample_rate, target_rate)?;
    shifted.resize(samples.len(), 0.0);
    Ok(shifted)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
