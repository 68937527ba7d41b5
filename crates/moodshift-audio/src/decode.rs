//! Upload decoding via symphonia (mp3, wav, m4a, flac).
//!
//! Output is always a mono [`AudioBuffer`]; multi-channel input is averaged
//! down.  The 8d preset re-widens to stereo itself.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::buffer::AudioBuffer;
use crate::error::AudioError;

/// Decode an audio file into a mono f32 buffer at its native sample rate.
pub fn decode_file(path: &Path) -> Result<AudioBuffer, AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Unsupported("no decodable audio track".into()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Unsupported("stream does not declare a sample rate".into()))?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channel_count = 0usize;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // Symphonia signals end-of-stream as an unexpected-EOF io error.
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count = spec.channels.count();
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
                });
                buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buf.samples());
            }
            // A corrupt packet is recoverable; skip it and keep decoding.
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "skipping undecodable packet");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if interleaved.is_empty() || channel_count == 0 {
        return Err(AudioError::Unsupported("file decoded to zero samples".into()));
    }

    let samples = downmix_interleaved(&interleaved, channel_count);
    debug!(
        frames = samples.len(),
        sample_rate,
        source_channels = channel_count,
        "decoded upload"
    );
    Ok(AudioBuffer::mono(samples, sample_rate))
}

/// Average interleaved frames down to one channel.
fn downmix_interleaved(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, secs: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (sample_rate as f32 * secs) as usize;
        for n in 0..frames {
            let t = n as f32 / sample_rate as f32;
            let s = (2.0 * std::f32::consts::PI * 440.0 * t).sin();
            for _ in 0..channels {
                writer.write_sample((s * 0.5 * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_mono_wav_at_native_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 44_100, 1, 0.25);

        let buf = decode_file(&path).unwrap();
        assert!(buf.is_mono());
        assert_eq!(buf.sample_rate(), 44_100);
        assert!((buf.duration_secs() - 0.25).abs() < 0.01);
    }

    #[test]
    fn stereo_wav_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone2.wav");
        write_sine_wav(&path, 22_050, 2, 0.1);

        let buf = decode_file(&path).unwrap();
        assert!(buf.is_mono());
        assert_eq!(buf.sample_rate(), 22_050);
    }

    #[test]
    fn garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();
        assert!(decode_file(&path).is_err());
    }

    #[test]
    fn downmix_preserves_frame_count() {
        let interleaved = vec![0.2f32, 0.4, -0.2, -0.4, 1.0, 0.0];
        let mono = downmix_interleaved(&interleaved, 2);
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[2] - 0.5).abs() < 1e-6);
    }
}
