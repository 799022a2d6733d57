use std::path::{Path, PathBuf};

use tracing::info;

use super::buffer::SampleBuffer;
use super::error::AudioExportError;
use crate::segments::Segment;

/// Write every segment as a 16-bit mono WAV named `<stem>_seg<N>.wav`.
///
/// `N` is 1-based and follows the order of `segments`. Returns the written paths.
pub fn export_segments(
    buffer: &SampleBuffer,
    segments: &[Segment],
    dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, AudioExportError> {
    if segments.is_empty() {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(dir).map_err(|source| AudioExportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut written = Vec::with_capacity(segments.len());
    for (idx, segment) in segments.iter().enumerate() {
        let path = dir.join(format!("{stem}_seg{}.wav", idx + 1));
        let clip = buffer.slice(segment.start_sample, segment.end_sample);
        write_clip(&path, spec, clip).map_err(|source| AudioExportError::Write {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    info!(count = written.len(), dir = %dir.display(), "exported segment clips");
    Ok(written)
}

fn write_clip(path: &Path, spec: hound::WavSpec, clip: &[f32]) -> Result<(), hound::Error> {
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in clip {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(scaled)?;
    }
    writer.finalize()
}
