use std::path::PathBuf;

use thiserror::Error;

use crate::audio::{AudioExportError, AudioLoadError};
use crate::render::ArtifactError;
use crate::spectrogram::TransformError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Audio(#[from] AudioLoadError),
    #[error("Invalid transform configuration: {0}")]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Export(#[from] AudioExportError),
    #[error("Failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
