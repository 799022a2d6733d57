use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::io::{project_root, resolve_paths};
use super::{ConfigError, SonoscopeConfig};
use crate::spectrogram::{ReferencePower, TransformKind};

/// Flat JSON layout used by earlier versions of the tool.
///
/// Empty strings are accepted wherever a number may be unset.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyConfig {
    input_directory: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    segment_directory: Option<PathBuf>,
    transform: Option<String>,
    sample_rate: Option<Value>,
    n_fft: Option<Value>,
    hop_ratio: Option<Value>,
    hop_length: Option<Value>,
    window: Option<String>,
    use_log_frequency: Option<bool>,
    fmin: Option<Value>,
    fmax: Option<Value>,
    n_mels: Option<Value>,
    power: Option<Value>,
    pcen_enabled: Option<bool>,
    per_frequency_normalization: Option<bool>,
    ref_power: Option<Value>,
    top_db: Option<Value>,
    dynamic_range: Option<Value>,
    contrast_percentile: Option<Value>,
    colormap: Option<String>,
    fig_width: Option<Value>,
    fig_height: Option<Value>,
    dpi: Option<Value>,
    max_duration_sec: Option<Value>,
    rms_frame_length: Option<Value>,
    rms_threshold: Option<Value>,
    min_segment_duration: Option<Value>,
    min_silence_duration: Option<Value>,
    sigmoid_k: Option<Value>,
    overlay_segments: Option<bool>,
}

/// Import a legacy flat JSON config into the sectioned layout.
///
/// Relative directories resolve against the JSON file's directory. A stored
/// `hop_length` equal to the one derived from `n_fft * hop_ratio` is dropped so
/// the hop keeps following the ratio.
pub fn import_legacy_json(path: &Path) -> Result<SonoscopeConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let legacy: LegacyConfig = serde_json::from_str(&text).map_err(|source| ConfigError::ParseJson {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = convert(legacy, path)?.normalized();
    resolve_paths(&mut config.paths, &project_root(path));
    Ok(config)
}

fn convert(legacy: LegacyConfig, path: &Path) -> Result<SonoscopeConfig, ConfigError> {
    let mut config = SonoscopeConfig::default();

    let paths = &mut config.paths;
    if let Some(dir) = legacy.input_directory {
        paths.input_dir = dir;
    }
    if let Some(dir) = legacy.output_directory {
        paths.output_dir = dir;
    }
    if let Some(dir) = legacy.segment_directory {
        paths.segment_dir = dir;
    }

    config.audio.sample_rate = number(&legacy.sample_rate).map(|v| v as u32);
    config.audio.max_duration_seconds = number(&legacy.max_duration_sec);

    let t = &mut config.transform;
    if let Some(name) = legacy.transform {
        t.kind = TransformKind::from_name(&name).ok_or_else(|| ConfigError::UnknownTransform {
            path: path.to_path_buf(),
            name,
        })?;
    }
    if let Some(n_fft) = number(&legacy.n_fft) {
        t.fft_size = n_fft as usize;
    }
    if let Some(ratio) = number(&legacy.hop_ratio) {
        t.hop_ratio = ratio as f32;
    }
    let derived_hop = (t.fft_size as f64 * t.hop_ratio as f64).floor() as usize;
    t.hop_length = number(&legacy.hop_length)
        .map(|v| v as usize)
        .filter(|hop| *hop != derived_hop);
    if let Some(window) = legacy.window {
        t.window = window;
    }
    t.fmin = number(&legacy.fmin).map(|v| v as f32);
    t.fmax = number(&legacy.fmax).map(|v| v as f32);
    if let Some(n_mels) = number(&legacy.n_mels) {
        t.mel_bin_count = n_mels as usize;
    }
    if let Some(power) = number(&legacy.power) {
        t.power_exponent = power as f32;
    }

    let s = &mut config.scaling;
    s.pcen.enabled = legacy.pcen_enabled.unwrap_or(false);
    s.per_frequency_normalize = legacy.per_frequency_normalization.unwrap_or(false);
    if legacy.ref_power.is_some() {
        s.reference_power = match number(&legacy.ref_power) {
            Some(value) => ReferencePower::Fixed(value as f32),
            None => ReferencePower::Max,
        };
    }
    s.top_db = number(&legacy.top_db).map(|v| v as f32);
    if let Some(range) = number(&legacy.dynamic_range) {
        s.dynamic_range_db = range as f32;
    }
    s.contrast_percentile = number(&legacy.contrast_percentile).map(|v| v as f32);

    let g = &mut config.segmentation;
    if let Some(frame) = number(&legacy.rms_frame_length) {
        g.rms_frame_length = frame as usize;
    }
    if let Some(threshold) = number(&legacy.rms_threshold) {
        g.rms_threshold = threshold as f32;
    }
    if let Some(min) = number(&legacy.min_segment_duration) {
        g.min_segment_duration_s = min as f32;
    }
    if let Some(min) = number(&legacy.min_silence_duration) {
        g.min_silence_duration_s = min as f32;
    }
    if let Some(k) = number(&legacy.sigmoid_k) {
        g.sigmoid_steepness = k as f32;
    }

    let r = &mut config.render;
    if let Some(colormap) = legacy.colormap {
        r.colormap = colormap;
    }
    r.log_frequency = legacy.use_log_frequency.unwrap_or(true);
    r.overlay_segments = legacy.overlay_segments.unwrap_or(false);
    let dpi = number(&legacy.dpi);
    let pixels = |inches: Option<f64>| match (inches, dpi) {
        (Some(inches), Some(dpi)) if inches > 0.0 && dpi > 0.0 => {
            Some((inches * dpi).round() as u32)
        }
        _ => None,
    };
    r.width = pixels(number(&legacy.fig_width));
    r.height = pixels(number(&legacy.fig_height));
    Ok(config)
}

/// Numbers may arrive as JSON numbers or numeric strings; `null` and `""` mean unset.
fn number(value: &Option<Value>) -> Option<f64> {
    let parsed = match value.as_ref()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
