use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a WAV file into a [`super::SampleBuffer`].
#[derive(Debug, Error)]
pub enum AudioLoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid wav: {source}")]
    Invalid { source: hound::Error },
    #[error("Sample error: {source}")]
    Sample { source: hound::Error },
    #[error("Unsupported wav layout: {bits_per_sample}-bit {format}")]
    Unsupported {
        bits_per_sample: u16,
        format: &'static str,
    },
}

/// Failures while writing detected segments out as individual clips.
#[derive(Debug, Error)]
pub enum AudioExportError {
    #[error("Unable to create segment directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write segment clip {path}: {source}")]
    Write { path: PathBuf, source: hound::Error },
}
