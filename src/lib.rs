//! Library exports for the renderer binary, benchmarks and tests.
/// Application directory helpers.
pub mod app_dirs;
/// WAV decoding, resampling and clip export.
pub mod audio;
/// Persistent configuration.
pub mod config;
/// Tracing setup.
pub mod logging;
/// End-to-end rendering runs.
pub mod pipeline;
/// Spectrogram painting and PNG output.
pub mod render;
/// Energy-based event detection.
pub mod segments;
/// Spectral transforms, normalisation and compression.
pub mod spectrogram;
