use std::fmt;

use ndarray::{Array2, Axis};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::SpectrogramMatrix;
use super::pcen::PcenConfig;
use super::transform::{SpectrumScale, TransformOutput};

const NORMALIZE_EPSILON: f32 = 1e-6;
/// Amplitude floor before taking the logarithm; about -100 dB re 1.0.
const AMPLITUDE_FLOOR: f32 = 1e-5;

/// What 0 dB refers to.
///
/// Stored as `"max"` or a plain number so both survive a TOML round trip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReferencePower {
    /// The largest finite value of the matrix being compressed.
    Max,
    Fixed(f32),
}

impl Default for ReferencePower {
    fn default() -> Self {
        Self::Fixed(1.0)
    }
}

impl ReferencePower {
    /// Non-positive or non-finite fixed references fall back to the maximum.
    pub fn normalized(self) -> Self {
        match self {
            Self::Fixed(value) if value.is_finite() && value > 0.0 => self,
            _ => Self::Max,
        }
    }
}

impl Serialize for ReferencePower {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Max => serializer.serialize_str("max"),
            Self::Fixed(value) => serializer.serialize_f32(*value),
        }
    }
}

impl<'de> Deserialize<'de> for ReferencePower {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ReferenceVisitor)
    }
}

struct ReferenceVisitor;

impl Visitor<'_> for ReferenceVisitor {
    type Value = ReferencePower;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("\"max\" or a positive number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        if value.trim().eq_ignore_ascii_case("max") {
            Ok(ReferencePower::Max)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(ReferencePower::Fixed(value as f32))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(ReferencePower::Fixed(value as f32))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(ReferencePower::Fixed(value as f32))
    }
}

/// Decibel conversion and contrast settings.
///
/// Config keys: `reference_power` (`"max"` or a number), `top_db`,
/// `dynamic_range_db`, `contrast_percentile`, `per_frequency_normalize`, `pcen`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    #[serde(default)]
    pub reference_power: ReferencePower,
    #[serde(default)]
    pub top_db: Option<f32>,
    #[serde(default = "default_dynamic_range_db")]
    pub dynamic_range_db: f32,
    /// Percentile in `[0, 100]` used as the display ceiling.
    #[serde(default)]
    pub contrast_percentile: Option<f32>,
    #[serde(default)]
    pub per_frequency_normalize: bool,
    #[serde(default)]
    pub pcen: PcenConfig,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            reference_power: ReferencePower::default(),
            top_db: None,
            dynamic_range_db: default_dynamic_range_db(),
            contrast_percentile: None,
            per_frequency_normalize: false,
            pcen: PcenConfig::default(),
        }
    }
}

fn default_dynamic_range_db() -> f32 {
    80.0
}

/// Turn transform output into a display-ready matrix.
///
/// With `pcen_applied` the values are already compressed, so the decibel and
/// per-frequency stages are skipped and the floor is the smallest PCEN value.
pub fn compress(
    output: TransformOutput,
    config: &ScalingConfig,
    pcen_applied: bool,
) -> SpectrogramMatrix {
    let TransformOutput {
        frequencies,
        times,
        magnitudes,
        scale,
        hop_length,
        ..
    } = output;
    let mut values = magnitudes;
    values.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });

    let (value_min, value_max) = if pcen_applied {
        let value_max = display_ceiling(&values, config.contrast_percentile);
        let value_min = finite_min(&values).min(value_max);
        (value_min, value_max)
    } else {
        to_decibels(&mut values, scale, config.reference_power, config.top_db);
        if config.per_frequency_normalize {
            normalize_rows(&mut values);
        }
        let value_max = display_ceiling(&values, config.contrast_percentile);
        let range = if config.dynamic_range_db.is_finite() {
            config.dynamic_range_db.max(0.0)
        } else {
            0.0
        };
        (value_max - range, value_max)
    };
    values.mapv_inplace(|v| v.max(value_min));
    debug!(value_min, value_max, pcen_applied, "compressed spectrogram");
    SpectrogramMatrix {
        frequencies,
        times,
        values,
        value_min,
        value_max,
        hop_length,
    }
}

fn to_decibels(
    values: &mut Array2<f32>,
    scale: SpectrumScale,
    reference: ReferencePower,
    top_db: Option<f32>,
) {
    let exponent = match scale {
        SpectrumScale::Amplitude => 1.0,
        SpectrumScale::Power { exponent } => exponent.max(f32::EPSILON),
    };
    let factor = scale.db_factor();
    let floor = AMPLITUDE_FLOOR.powf(exponent).max(f32::MIN_POSITIVE);
    let reference = match reference.normalized() {
        ReferencePower::Fixed(value) => value,
        ReferencePower::Max => finite_max(values),
    };
    let ref_db = factor * reference.max(floor).log10();
    values.mapv_inplace(|v| factor * v.max(floor).log10() - ref_db);
    if let Some(top_db) = top_db.filter(|t| t.is_finite() && *t >= 0.0) {
        let cutoff = finite_max(values) - top_db;
        values.mapv_inplace(|v| v.max(cutoff));
    }
}

/// Z-score each frequency row. Rows without spread become all zeros.
fn normalize_rows(values: &mut Array2<f32>) {
    for mut row in values.axis_iter_mut(Axis(0)) {
        let n = row.len().max(1) as f64;
        let mean = row.iter().map(|&v| v as f64).sum::<f64>() / n;
        let variance = row
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let std = variance.sqrt();
        if std <= f64::EPSILON * mean.abs().max(1.0) {
            row.fill(0.0);
            continue;
        }
        let denom = std + NORMALIZE_EPSILON as f64;
        row.mapv_inplace(|v| ((v as f64 - mean) / denom) as f32);
    }
}

fn display_ceiling(values: &Array2<f32>, percentile: Option<f32>) -> f32 {
    match percentile.filter(|p| p.is_finite()) {
        Some(p) => {
            let mut sorted: Vec<f32> = values.iter().copied().collect();
            sorted.sort_by(f32::total_cmp);
            percentile_of_sorted(&sorted, p)
        }
        None => finite_max(values),
    }
}

/// Linearly interpolated percentile of ascending `sorted`; `p` is clamped to `[0, 100]`.
pub(crate) fn percentile_of_sorted(sorted: &[f32], p: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn finite_max(values: &Array2<f32>) -> f32 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f32::max)
        .unwrap_or(0.0)
}

fn finite_min(values: &Array2<f32>) -> f32 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f32::min)
        .unwrap_or(0.0)
}
