//! End-to-end runs: decode, analyse, paint and persist.
//!
//! One buffer is fully processed before the next file is read. The hop length
//! is derived once per request and handed to both the transform and the
//! segment detector so overlay boundaries line up with spectrogram columns.

mod error;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::audio::{SampleBuffer, export_segments, load_wav};
use crate::config::SonoscopeConfig;
use crate::render::{Renderer, write_png_verified};
use crate::segments::{self, Segment, Segmentation, SegmentationStatus};
use crate::spectrogram::{self, FrequencyBounds, SpectrogramMatrix, TransformKind, pcen};

pub use error::PipelineError;

/// Hop shared by the transform and the segment detector.
///
/// An explicit `hop_length` wins; otherwise `floor(fft_size * hop_ratio)`.
/// A zero result is passed through so the transform rejects it.
pub fn effective_hop_length(config: &SonoscopeConfig) -> usize {
    let t = &config.transform;
    t.hop_length
        .unwrap_or_else(|| (t.fft_size as f64 * t.hop_ratio as f64).floor() as usize)
}

/// Numeric results for one buffer.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub matrix: SpectrogramMatrix,
    pub segmentation: Segmentation,
    pub kind: TransformKind,
    pub bounds: FrequencyBounds,
    pub hop_length: usize,
    pub sample_rate: u32,
    pub pcen_applied: bool,
}

/// Transform, optionally normalise, compress and segment `buffer`.
pub fn analyze(
    buffer: &SampleBuffer,
    config: &SonoscopeConfig,
) -> Result<Analysis, PipelineError> {
    let hop_length = effective_hop_length(config);
    let mut output = spectrogram::compute(buffer, &config.transform.engine_config(hop_length))?;
    let pcen_applied = config.scaling.pcen.enabled;
    if pcen_applied {
        output.magnitudes = pcen::apply(
            &output.magnitudes,
            output.sample_rate,
            output.hop_length,
            &config.scaling.pcen,
        );
    }
    let kind = output.kind;
    let bounds = output.bounds.clone();
    let matrix = spectrogram::compress(output, &config.scaling, pcen_applied);
    let segmentation = segments::detect(buffer, &config.segmentation, hop_length);
    Ok(Analysis {
        matrix,
        segmentation,
        kind,
        bounds,
        hop_length,
        sample_rate: buffer.sample_rate(),
        pcen_applied,
    })
}

/// Where outputs go and which optional steps run.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub output_dir: PathBuf,
    pub segment_dir: PathBuf,
    pub overlay_segments: bool,
    pub export_segments: bool,
}

impl RenderOptions {
    pub fn from_config(config: &SonoscopeConfig) -> Self {
        Self {
            output_dir: config.paths.output_dir.clone(),
            segment_dir: config.paths.segment_dir.clone(),
            overlay_segments: config.render.overlay_segments,
            export_segments: config.render.export_segments,
        }
    }
}

/// What a single successful render produced.
#[derive(Clone, Debug)]
pub struct RenderOutcome {
    pub input: PathBuf,
    pub image_path: PathBuf,
    pub segments: Vec<Segment>,
    pub segmentation_status: SegmentationStatus,
    pub bounds: FrequencyBounds,
    pub exported: Vec<PathBuf>,
}

/// Renderer sized from the config's `render.width` / `render.height`.
pub fn renderer_for(config: &SonoscopeConfig) -> Renderer {
    Renderer::new(config.render.width, config.render.height)
        .with_colorbar(config.render.colorbar)
}

/// Render one WAV to `<stem>_spectrogram.png` in the output directory.
pub fn render_file(
    wav_path: &Path,
    config: &SonoscopeConfig,
    renderer: &Renderer,
    options: &RenderOptions,
) -> Result<RenderOutcome, PipelineError> {
    let buffer =
        load_wav(wav_path, config.audio.sample_rate)?.truncated(config.audio.max_duration_seconds);
    let analysis = analyze(&buffer, config)?;
    let overlay = options
        .overlay_segments
        .then_some(analysis.segmentation.segments.as_slice());
    let image = renderer.render(
        &analysis.matrix,
        &config.render.color(),
        config.render.frequency_scale(analysis.kind),
        overlay,
    );
    let stem = file_stem(wav_path);
    let image_path = options.output_dir.join(format!("{stem}_spectrogram.png"));
    write_png_verified(&image, &image_path)?;
    let exported = if options.export_segments {
        export_segments(&buffer, &analysis.segmentation.segments, &options.segment_dir, &stem)?
    } else {
        Vec::new()
    };
    info!(
        input = %wav_path.display(),
        output = %image_path.display(),
        segments = analysis.segmentation.segments.len(),
        "rendered spectrogram"
    );
    Ok(RenderOutcome {
        input: wav_path.to_path_buf(),
        image_path,
        segments: analysis.segmentation.segments,
        segmentation_status: analysis.segmentation.status,
        bounds: analysis.bounds,
        exported,
    })
}

/// Per-file results of a directory run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rendered: Vec<RenderOutcome>,
    pub failures: Vec<(PathBuf, PipelineError)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render every `.wav` directly inside `input_dir`, in name order.
///
/// Files are independent: one failure is logged and recorded without
/// stopping the rest. Only an unreadable directory fails the whole run.
pub fn render_directory(
    input_dir: &Path,
    config: &SonoscopeConfig,
    renderer: &Renderer,
    options: &RenderOptions,
) -> Result<BatchReport, PipelineError> {
    let files = list_wav_files(input_dir)?;
    if files.is_empty() {
        warn!(dir = %input_dir.display(), "no wav files found");
    }
    let mut report = BatchReport::default();
    for path in files {
        match render_file(&path, config, renderer, options) {
            Ok(outcome) => report.rendered.push(outcome),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "render failed");
                report.failures.push((path, err));
            }
        }
    }
    info!(
        rendered = report.rendered.len(),
        failed = report.failures.len(),
        "batch complete"
    );
    Ok(report)
}

fn list_wav_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let read_err = |source| PipelineError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if is_wav && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "audio".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn hop_prefers_explicit_length() {
        let mut config = SonoscopeConfig::default();
        assert_eq!(effective_hop_length(&config), 256);
        config.transform.hop_length = Some(300);
        assert_eq!(effective_hop_length(&config), 300);
    }

    #[test]
    fn analysis_shares_hop_between_stages() {
        let sr = 16_000;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|i| {
                let t = i as f32 / sr as f32;
                if (0.4..0.6).contains(&t) {
                    0.5 * (2.0 * PI * 1_000.0 * t).sin()
                } else {
                    0.0
                }
            })
            .collect();
        let buffer = SampleBuffer::new(samples, sr);
        let mut config = SonoscopeConfig::default();
        config.transform.fft_size = 1024;
        let analysis = analyze(&buffer, &config).unwrap();
        assert_eq!(analysis.hop_length, 128);
        assert_eq!(analysis.matrix.columns(), sr as usize / 128);
        assert_eq!(analysis.matrix.hop_length, 128);
        assert_eq!(analysis.segmentation.segments.len(), 1);
        for segment in &analysis.segmentation.segments {
            assert_eq!(segment.start_sample % analysis.hop_length, 0);
        }
    }

    #[test]
    fn pcen_path_keeps_matrix_bounded() {
        let samples: Vec<f32> = (0..8_000)
            .map(|i| ((i % 40) as f32 / 40.0) - 0.5)
            .collect();
        let buffer = SampleBuffer::new(samples, 8_000);
        let mut config = SonoscopeConfig::default();
        config.transform.kind = TransformKind::Mel;
        config.transform.mel_bin_count = 40;
        config.scaling.pcen.enabled = true;
        let analysis = analyze(&buffer, &config).unwrap();
        assert!(analysis.pcen_applied);
        let m = &analysis.matrix;
        assert!(m.value_min <= m.value_max);
        assert!(m.values.iter().all(|v| v.is_finite() && *v >= m.value_min));
    }

    #[test]
    fn zero_hop_is_a_config_error() {
        let buffer = SampleBuffer::new(vec![0.0_f32; 100], 8_000);
        let mut config = SonoscopeConfig::default();
        config.transform.fft_size = 4;
        config.transform.hop_ratio = 0.1;
        let err = analyze(&buffer, &config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transform(spectrogram::TransformError::InvalidHopLength)
        ));
    }
}
