use thiserror::Error;

/// Configuration-shape errors raised by the transform engine.
///
/// These are never auto-corrected; they point at a bug in whatever built the
/// configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("Unknown window function '{name}' (expected hann, hamming, blackman or rectangular)")]
    UnknownWindow { name: String },
    #[error("FFT size must be positive")]
    InvalidFftSize,
    #[error("Hop length must be positive")]
    InvalidHopLength,
    #[error("Hop length {hop_length} exceeds FFT size {fft_size}")]
    HopExceedsFftSize { hop_length: usize, fft_size: usize },
    #[error("Mel transform needs at least one mel band")]
    InvalidMelBinCount,
    #[error("Power exponent must be finite and positive, got {value}")]
    InvalidPowerExponent { value: f32 },
}
