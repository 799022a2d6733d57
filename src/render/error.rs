use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Both the primary and the fallback encode produced an unreadable file.
    #[error("PNG at {path} failed verification after retry: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}
