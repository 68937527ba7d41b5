//! In-memory audio buffer: planar f32 samples plus a sample rate.

/// Decoded audio, one `Vec<f32>` per channel (mono or stereo).
///
/// Samples are nominally in [-1.0, 1.0]; transform stages may exceed that
/// range transiently, the WAV encoder clamps on write.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { channels: vec![samples], sample_rate }
    }

    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self { channels: vec![left, right], sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_mono(&self) -> bool {
        self.channels.len() == 1
    }

    /// Number of sample frames (per-channel length).
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Consume the buffer, returning the planar channel data.
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Duplicate a mono buffer into two identical channels.  Stereo buffers
    /// are returned unchanged.
    pub fn to_stereo(self) -> Self {
        if self.channels.len() >= 2 {
            return self;
        }
        let left = self.channels.into_iter().next().unwrap_or_default();
        let right = left.clone();
        Self { channels: vec![left, right], sample_rate: self.sample_rate }
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Average all channels down to one (interleave-agnostic downmix).
    pub fn downmix_to_mono(self) -> Self {
        if self.channels.len() <= 1 {
            return self;
        }
        let frames = self.frames();
        let n = self.channels.len() as f32;
        let mut mixed = vec![0.0f32; frames];
        for channel in &self.channels {
            for (out, s) in mixed.iter_mut().zip(channel.iter()) {
                *out += s / n;
            }
        }
        Self { channels: vec![mixed], sample_rate: self.sample_rate }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mono_frame_count_and_duration() {
        let buf = AudioBuffer::mono(vec![0.0; 44_100], 44_100);
        assert_eq!(buf.frames(), 44_100);
        assert!((buf.duration_secs() - 1.0).abs() < 1e-9);
        assert!(buf.is_mono());
    }

    #[test]
    fn to_stereo_duplicates_mono() {
        let buf = AudioBuffer::mono(vec![0.5, -0.5], 8_000).to_stereo();
        assert_eq!(buf.channel_count(), 2);
        assert_eq!(buf.channel(0), buf.channel(1));
    }

    #[test]
    fn to_stereo_keeps_existing_stereo() {
        let buf = AudioBuffer::stereo(vec![1.0], vec![-1.0], 8_000).to_stereo();
        assert_eq!(buf.channel(0), &[1.0]);
        assert_eq!(buf.channel(1), &[-1.0]);
    }

    #[test]
    fn downmix_averages_channels() {
        let buf = AudioBuffer::stereo(vec![1.0, 0.0], vec![0.0, 1.0], 8_000);
        let mono = buf.downmix_to_mono();
        assert!(mono.is_mono());
        assert_eq!(mono.channel(0), &[0.5, 0.5]);
    }

    #[test]
    fn peak_is_max_abs() {
        let buf = AudioBuffer::stereo(vec![0.25, -0.75], vec![0.5, 0.1], 8_000);
        assert_eq!(buf.peak(), 0.75);
    }
}
