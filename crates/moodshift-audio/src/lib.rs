//! moodshift-audio – decoding, encoding and the four style-transform presets.
//!
//! The pipeline a conversion job runs is:
//!
//! 1. [`decode::decode_file`] – probe and decode the upload (mp3 / wav /
//!    m4a / flac) into a mono [`AudioBuffer`].
//! 2. [`Preset::apply`] – one of the four fixed DSP pipelines.
//! 3. [`encode::write_wav`] – serialize the result as 16-bit PCM WAV.
//!
//! Everything here is synchronous and CPU-bound; callers are expected to
//! run it on a blocking thread.

pub mod buffer;
pub mod decode;
pub mod dsp;
pub mod encode;
pub mod error;
pub mod preset;
pub mod resample;

pub use buffer::AudioBuffer;
pub use error::AudioError;
pub use preset::Preset;
