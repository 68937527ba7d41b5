//! The four style-transform presets.
//!
//! Each preset is a fixed sequence of [`crate::dsp`] calls with the
//! parameter table below; there is no adaptive logic.  Filter cutoffs that
//! the reference pipeline expressed as a fraction of Nyquist are kept in
//! that form and converted per input sample rate.

use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::buffer::AudioBuffer;
use crate::dsp;
use crate::error::AudioError;
use crate::resample::resample;

// ── Parameter table ──────────────────────────────────────────────────────────

/// Lo-fi: fixed output rate (the "vintage" downsample target).
const LOFI_TARGET_RATE: u32 = 22_050;
/// Lo-fi: low-pass cutoff as a fraction of Nyquist, 4th order.
const LOFI_CUTOFF_RATIO: f32 = 0.3;
const LOFI_CRACKLE_SIGMA: f32 = 0.01;
const LOFI_CRACKLE_MIX: f32 = 0.1;
/// Lo-fi: dry/wet blend of the −1 semitone warble.
const LOFI_DRY_MIX: f32 = 0.7;
const LOFI_WET_MIX: f32 = 0.3;
const LOFI_PITCH_SEMITONES: f32 = -1.0;

const PHONK_DRIVE: f32 = 2.0;
const PHONK_DRIVE_GAIN: f32 = 0.8;
/// Phonk: bass band kept below 200 Hz, 2nd order.
const PHONK_BASS_CUTOFF_HZ: f32 = 200.0;
const PHONK_COMPRESS_FACTOR: f32 = 10.0;
const PHONK_PREEMPHASIS: f32 = 0.95;

/// Melody: high-pass cutoff as a fraction of Nyquist, 4th order.
const MELODY_CUTOFF_RATIO: f32 = 0.1;
const MELODY_BAND_LOW_HZ: f32 = 1_000.0;
const MELODY_BAND_HIGH_HZ: f32 = 5_000.0;
const MELODY_BAND_GAIN: f32 = 1.5;
const MELODY_PREEMPHASIS: f32 = 0.97;

/// 8d: inter-channel offset in seconds (1 ms).
const SPATIAL_DELAY_SECS: f32 = 0.001;
const SPATIAL_LEFT_HP_RATIO: f32 = 0.2;
const SPATIAL_RIGHT_LP_RATIO: f32 = 0.3;
const SPATIAL_PREEMPHASIS: f32 = 0.95;

fn nyquist_fraction(sample_rate: u32, ratio: f32) -> f32 {
    sample_rate as f32 / 2.0 * ratio
}

// ── Preset ───────────────────────────────────────────────────────────────────

/// Conversion category, as it appears in the upload URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Preset {
    #[strum(serialize = "lofi")]
    Lofi,
    #[strum(serialize = "phonk")]
    Phonk,
    #[strum(serialize = "melody")]
    Melody,
    #[strum(serialize = "8d")]
    EightD,
}

impl Preset {
    /// Run the preset's pipeline over a decoded buffer.
    ///
    /// Input is mono (the decoder downmixes); every preset except
    /// [`Preset::EightD`] produces mono, 8d produces stereo.
    pub fn apply(self, buffer: AudioBuffer) -> Result<AudioBuffer, AudioError> {
        debug!(preset = %self, frames = buffer.frames(), rate = buffer.sample_rate(), "applying preset");
        match self {
            Preset::Lofi => lofi(buffer),
            Preset::Phonk => phonk(buffer),
            Preset::Melody => melody(buffer),
            Preset::EightD => eight_d(buffer),
        }
    }
}

// ── Pipelines ────────────────────────────────────────────────────────────────

/// Warm low-passed signal, vinyl crackle, a detuned blend, then a fixed-rate
/// downsample.
fn lofi(buffer: AudioBuffer) -> Result<AudioBuffer, AudioError> {
    let rate = buffer.sample_rate();
    let buffer = buffer.downmix_to_mono();
    let samples = buffer.channel(0);

    let y = dsp::low_pass(samples, rate, nyquist_fraction(rate, LOFI_CUTOFF_RATIO), 4)?;
    let y = dsp::add_noise(&y, LOFI_CRACKLE_SIGMA, LOFI_CRACKLE_MIX);
    let warble = dsp::pitch_shift(&y, rate, LOFI_PITCH_SEMITONES)?;
    let y: Vec<f32> = y
        .iter()
        .zip(warble.iter())
        .map(|(dry, wet)| LOFI_DRY_MIX * dry + LOFI_WET_MIX * wet)
        .collect();
    let y = resample(&y, rate, LOFI_TARGET_RATE)?;

    Ok(AudioBuffer::mono(y, LOFI_TARGET_RATE))
}

/// Saturation, a hard-clamped bass layer, log compression and pre-emphasis.
fn phonk(buffer: AudioBuffer) -> Result<AudioBuffer, AudioError> {
    let rate = buffer.sample_rate();
    let buffer = buffer.downmix_to_mono();
    let samples = buffer.channel(0);

    let y = dsp::soft_clip(samples, PHONK_DRIVE, PHONK_DRIVE_GAIN);
    let bass = dsp::low_pass(&y, rate, PHONK_BASS_CUTOFF_HZ, 2)?;
    let y: Vec<f32> = y
        .iter()
        .zip(bass.iter())
        .map(|(s, b)| (s + b).clamp(-1.0, 1.0))
        .collect();
    let y = dsp::log_compress(&y, PHONK_COMPRESS_FACTOR);
    let y = dsp::pre_emphasis(&y, PHONK_PREEMPHASIS);

    Ok(AudioBuffer::mono(y, rate))
}

/// High-pass the mud away, boost the 1–5 kHz band, brighten and normalize.
fn melody(buffer: AudioBuffer) -> Result<AudioBuffer, AudioError> {
    let rate = buffer.sample_rate();
    let buffer = buffer.downmix_to_mono();
    let samples = buffer.channel(0);

    let y = dsp::high_pass(samples, rate, nyquist_fraction(rate, MELODY_CUTOFF_RATIO), 4)?;
    let y = dsp::band_boost(&y, rate, MELODY_BAND_LOW_HZ, MELODY_BAND_HIGH_HZ, MELODY_BAND_GAIN);
    let y = dsp::pre_emphasis(&y, MELODY_PREEMPHASIS);
    let y = dsp::normalize_peak(&y);

    Ok(AudioBuffer::mono(y, rate))
}

/// Widen to stereo, offset one ear, filter the ears complementarily.
fn eight_d(buffer: AudioBuffer) -> Result<AudioBuffer, AudioError> {
    let rate = buffer.sample_rate();
    let stereo = buffer.to_stereo();
    let mut channels = stereo.into_channels();
    let right = channels.pop().unwrap_or_default();
    let left = channels.pop().unwrap_or_default();

    let delay_frames = (rate as f32 * SPATIAL_DELAY_SECS) as usize;
    let right = dsp::rotate_delay(&right, delay_frames);

    let left = dsp::high_pass(&left, rate, nyquist_fraction(rate, SPATIAL_LEFT_HP_RATIO), 2)?;
    let right = dsp::low_pass(&right, rate, nyquist_fraction(rate, SPATIAL_RIGHT_LP_RATIO), 2)?;

    let left = dsp::pre_emphasis(&left, SPATIAL_PREEMPHASIS);
    let right = dsp::pre_emphasis(&right, SPATIAL_PREEMPHASIS);

    Ok(AudioBuffer::stereo(left, right, rate))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
