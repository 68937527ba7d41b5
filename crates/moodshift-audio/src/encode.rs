//! WAV output via hound (16-bit PCM, mono or stereo).

use std::path::Path;

use crate::buffer::AudioBuffer;
use crate::error::AudioError;

/// Write a buffer as 16-bit PCM WAV, interleaving channels and clamping
/// samples that transform stages pushed past full scale.
pub fn write_wav(buffer: &AudioBuffer, path: &Path) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: buffer.channel_count() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for frame in 0..buffer.frames() {
        for channel in buffer.channels() {
            let scaled = (channel[frame] * 32767.0).clamp(-32767.0, 32767.0) as i16;
            writer.write_sample(scaled)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn writes_mono_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let buf = AudioBuffer::mono(vec![0.0, 0.5, -0.5, 1.0], 22_050);
        write_wav(&buf, &path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22_050);
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn writes_stereo_interleaved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out2.wav");
        let buf = AudioBuffer::stereo(vec![1.0, 1.0], vec![-1.0, -1.0], 44_100);
        write_wav(&buf, &path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![32767, -32767, 32767, -32767]);
    }

    #[test]
    fn overdriven_samples_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        let buf = AudioBuffer::mono(vec![4.0, -4.0], 8_000);
        write_wav(&buf, &path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![32767, -32767]);
    }
}
