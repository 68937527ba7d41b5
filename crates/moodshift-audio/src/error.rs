//! Unified error type for the audio pipeline.

use thiserror::Error;

/// All errors that can occur while decoding, transforming or encoding audio.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The container/codec probe or packet decode failed.
    #[error("decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// The decoded stream contained no usable audio.
    #[error("unsupported input: {0}")]
    Unsupported(String),

    #[error("resampler construction failed: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),

    /// biquad's error enum does not implement `std::error::Error`; the
    /// variant carries its debug rendering instead.
    #[error("filter design failed: {0}")]
    Filter(String),

    #[error("encode error: {0}")]
    Encode(#[from] hound::Error),
}
