//! Persisted settings for a render run.
//!
//! Config keys (TOML): `paths`, `audio`, `transform`, `scaling`,
//! `segmentation`, `render`. Every field has a serde default so partial files
//! load; derived engine state such as the effective hop length is never stored.

mod error;
mod io;
mod legacy;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::render::{ColorConfig, FrequencyScale};
use crate::segments::SegmentationConfig;
use crate::spectrogram::{ScalingConfig, TransformConfig, TransformKind};

pub use error::ConfigError;
pub use io::{load_from_path, load_or_default, save_to_path};
pub use legacy::import_legacy_json;

/// File name used for the per-user default config.
pub const CONFIG_FILE_NAME: &str = crate::app_dirs::CONFIG_FILE_NAME;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SonoscopeConfig {
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub transform: TransformSettings,
    #[serde(default)]
    pub scaling: ScalingConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub render: RenderSettings,
}

/// Input and output locations; relative entries resolve against the config
/// file's directory.
///
/// Config keys: `input_dir`, `output_dir`, `segment_dir`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_segment_dir")]
    pub segment_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            segment_dir: default_segment_dir(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_segment_dir() -> PathBuf {
    PathBuf::from("segments")
}

/// Config keys: `sample_rate`, `max_duration_seconds`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Resample to this rate after decoding; `None` keeps the file's rate.
    #[serde(default)]
    pub sample_rate: Option<u32>,
    /// Only the leading part of longer files is analysed.
    #[serde(default)]
    pub max_duration_seconds: Option<f64>,
}

/// Config keys: `kind`, `fft_size`, `hop_ratio`, `hop_length`, `window`,
/// `fmin`, `fmax`, `mel_bin_count`, `power_exponent`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformSettings {
    #[serde(default)]
    pub kind: TransformKind,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Hop as a fraction of `fft_size`, used when `hop_length` is unset.
    #[serde(default = "default_hop_ratio")]
    pub hop_ratio: f32,
    #[serde(default)]
    pub hop_length: Option<usize>,
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default)]
    pub fmin: Option<f32>,
    #[serde(default)]
    pub fmax: Option<f32>,
    #[serde(default = "default_mel_bin_count")]
    pub mel_bin_count: usize,
    #[serde(default = "default_power_exponent")]
    pub power_exponent: f32,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            kind: TransformKind::default(),
            fft_size: default_fft_size(),
            hop_ratio: default_hop_ratio(),
            hop_length: None,
            window: default_window(),
            fmin: None,
            fmax: None,
            mel_bin_count: default_mel_bin_count(),
            power_exponent: default_power_exponent(),
        }
    }
}

impl TransformSettings {
    /// Engine configuration for one run at the shared `hop_length`.
    pub fn engine_config(&self, hop_length: usize) -> TransformConfig {
        TransformConfig {
            kind: self.kind,
            fft_size: self.fft_size,
            hop_length,
            window: self.window.clone(),
            fmin: self.fmin,
            fmax: self.fmax,
            mel_bin_count: self.mel_bin_count,
            power_exponent: self.power_exponent,
        }
    }
}

fn default_fft_size() -> usize {
    2048
}

fn default_hop_ratio() -> f32 {
    0.125
}

fn default_window() -> String {
    "hann".to_string()
}

fn default_mel_bin_count() -> usize {
    512
}

fn default_power_exponent() -> f32 {
    2.0
}

/// Config keys: `colormap`, `lighten_floor`, `log_frequency`, `colorbar`,
/// `overlay_segments`, `export_segments`, `width`, `height`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "default_colormap")]
    pub colormap: String,
    #[serde(default)]
    pub lighten_floor: Option<f32>,
    /// Logarithmic frequency axis for the linear transform.
    #[serde(default = "default_true")]
    pub log_frequency: bool,
    /// Colour bar strip to the right of the plot.
    #[serde(default = "default_true")]
    pub colorbar: bool,
    #[serde(default)]
    pub overlay_segments: bool,
    #[serde(default)]
    pub export_segments: bool,
    /// Plot size in pixels; unset means one pixel per spectrogram cell.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            colormap: default_colormap(),
            lighten_floor: None,
            log_frequency: true,
            colorbar: true,
            overlay_segments: false,
            export_segments: false,
            width: None,
            height: None,
        }
    }
}

impl RenderSettings {
    pub fn color(&self) -> ColorConfig {
        ColorConfig {
            colormap: self.colormap.clone(),
            lighten_floor: self.lighten_floor,
        }
    }

    pub fn frequency_scale(&self, kind: TransformKind) -> FrequencyScale {
        FrequencyScale::for_transform(kind, self.log_frequency)
    }
}

fn default_colormap() -> String {
    "gray_r".to_string()
}

fn default_true() -> bool {
    true
}

impl SonoscopeConfig {
    /// Clamp numeric fields into the ranges the engine expects.
    ///
    /// Shape errors the engine reports itself (unknown window, hop larger
    /// than the FFT) are left alone so they still fail loudly.
    pub fn normalized(mut self) -> Self {
        let t = &mut self.transform;
        if !t.hop_ratio.is_finite() || t.hop_ratio <= 0.0 {
            t.hop_ratio = default_hop_ratio();
        }
        t.hop_length = t.hop_length.filter(|hop| *hop > 0);
        t.fmin = t.fmin.filter(|f| f.is_finite());
        t.fmax = t.fmax.filter(|f| f.is_finite() && *f > 0.0);
        if !t.power_exponent.is_finite() || t.power_exponent <= 0.0 {
            t.power_exponent = default_power_exponent();
        }
        t.window = t.window.trim().to_string();

        let s = &mut self.scaling;
        s.reference_power = s.reference_power.normalized();
        s.top_db = s.top_db.filter(|v| v.is_finite() && *v > 0.0);
        if !s.dynamic_range_db.is_finite() || s.dynamic_range_db < 0.0 {
            s.dynamic_range_db = ScalingConfig::default().dynamic_range_db;
        }
        // 0 disables the percentile ceiling
        s.contrast_percentile = s
            .contrast_percentile
            .filter(|p| p.is_finite() && *p > 0.0)
            .map(|p| p.min(100.0));
        if !s.pcen.bias.is_finite() || s.pcen.bias < 0.0 {
            s.pcen.bias = 0.0;
        }
        if !s.pcen.gain_alpha.is_finite() {
            s.pcen.gain_alpha = crate::spectrogram::PcenConfig::default().gain_alpha;
        }

        let g = &mut self.segmentation;
        let defaults = SegmentationConfig::default();
        g.rms_frame_length = g.rms_frame_length.max(1);
        g.rms_threshold = if g.rms_threshold.is_finite() {
            g.rms_threshold.clamp(0.0, 1.0)
        } else {
            defaults.rms_threshold
        };
        if !g.sigmoid_steepness.is_finite() {
            g.sigmoid_steepness = defaults.sigmoid_steepness;
        }
        if !g.min_segment_duration_s.is_finite() || g.min_segment_duration_s < 0.0 {
            g.min_segment_duration_s = defaults.min_segment_duration_s;
        }
        if !g.min_silence_duration_s.is_finite() || g.min_silence_duration_s < 0.0 {
            g.min_silence_duration_s = defaults.min_silence_duration_s;
        }

        self.audio.sample_rate = self.audio.sample_rate.filter(|sr| *sr > 0);
        self.audio.max_duration_seconds = self
            .audio
            .max_duration_seconds
            .filter(|s| s.is_finite() && *s > 0.0);
        self.render.lighten_floor = self
            .render
            .lighten_floor
            .filter(|f| f.is_finite())
            .map(|f| f.clamp(0.0, 1.0));
        self.render.width = self.render.width.filter(|w| *w > 0);
        self.render.height = self.render.height.filter(|h| *h > 0);
        self
    }
}

/// Stages that must rerun after moving from one config snapshot to another.
///
/// Each flag implies the ones after it: a new transform needs rescaling and
/// repainting, new segments need repainting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    pub decode: bool,
    pub transform: bool,
    pub scaling: bool,
    pub segmentation: bool,
    pub render: bool,
}

impl ConfigDiff {
    pub fn between(old: &SonoscopeConfig, new: &SonoscopeConfig) -> Self {
        let decode = old.audio != new.audio || old.paths.input_dir != new.paths.input_dir;
        let transform = decode || old.transform != new.transform;
        let scaling = transform || old.scaling != new.scaling;
        let segmentation =
            decode || old.segmentation != new.segmentation || hop_inputs_changed(old, new);
        let render = scaling || segmentation || old.render != new.render || old.paths != new.paths;
        Self {
            decode,
            transform,
            scaling,
            segmentation,
            render,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.decode || self.transform || self.scaling || self.segmentation || self.render)
    }
}

fn hop_inputs_changed(old: &SonoscopeConfig, new: &SonoscopeConfig) -> bool {
    old.transform.fft_size != new.transform.fft_size
        || old.transform.hop_ratio != new.transform.hop_ratio
        || old.transform.hop_length != new.transform.hop_length
}
