use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Smoothing time constant of the per-channel energy trace, in seconds.
const TIME_CONSTANT_SECONDS: f32 = 0.4;
const EPSILON: f32 = 1e-6;
const COMPRESSION_EXPONENT: f32 = 0.5;

/// Per-channel energy normalisation knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcenConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bias")]
    pub bias: f32,
    #[serde(default = "default_gain_alpha")]
    pub gain_alpha: f32,
}

impl Default for PcenConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bias: default_bias(),
            gain_alpha: default_gain_alpha(),
        }
    }
}

fn default_bias() -> f32 {
    2.0
}

fn default_gain_alpha() -> f32 {
    0.98
}

/// One-pole smoothing coefficient for the frame rate `sample_rate / hop_length`.
pub(crate) fn smoothing_coefficient(sample_rate: u32, hop_length: usize) -> f32 {
    let frames = TIME_CONSTANT_SECONDS * sample_rate.max(1) as f32 / hop_length.max(1) as f32;
    let t2 = frames * frames;
    ((1.0 + 4.0 * t2).sqrt() - 1.0) / (2.0 * t2)
}

/// Apply PCEN row by row to a `(frequency, frame)` energy matrix.
///
/// Negative or non-finite inputs are treated as zero energy.
pub fn apply(
    matrix: &Array2<f32>,
    sample_rate: u32,
    hop_length: usize,
    config: &PcenConfig,
) -> Array2<f32> {
    let s = smoothing_coefficient(sample_rate, hop_length);
    let alpha = config.gain_alpha;
    let bias = config.bias.max(0.0);
    let offset = bias.powf(COMPRESSION_EXPONENT);
    let mut out = Array2::<f32>::zeros(matrix.dim());
    for (row_in, mut row_out) in matrix.rows().into_iter().zip(out.rows_mut()) {
        let mut smooth = 0.0_f32;
        for (t, (&energy, slot)) in row_in.iter().zip(row_out.iter_mut()).enumerate() {
            let energy = if energy.is_finite() { energy.max(0.0) } else { 0.0 };
            smooth = if t == 0 {
                energy
            } else {
                (1.0 - s) * smooth + s * energy
            };
            let gain = (EPSILON + smooth).powf(alpha);
            *slot = (energy / gain + bias).powf(COMPRESSION_EXPONENT) - offset;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn smoothing_coefficient_is_small_for_fast_frame_rates() {
        let s = smoothing_coefficient(22_050, 512);
        assert!(s > 0.0 && s < 0.1, "s = {s}");
        let slow = smoothing_coefficient(100, 100);
        assert!(slow > s);
    }

    #[test]
    fn silence_maps_to_zero() {
        let matrix = Array2::<f32>::zeros((3, 5));
        let out = apply(&matrix, 16_000, 256, &PcenConfig::default());
        assert!(out.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn stationary_energy_is_suppressed_relative_to_onset() {
        let mut matrix = Array2::<f32>::from_elem((1, 400), 1.0);
        matrix[[0, 399]] = 50.0;
        let out = apply(&matrix, 16_000, 160, &PcenConfig::default());
        let settled = out[[0, 398]];
        let onset = out[[0, 399]];
        assert!(onset > settled * 4.0, "onset {onset} settled {settled}");
    }

    #[test]
    fn output_is_finite_and_shape_preserving() {
        let matrix = array![[0.0, 1e-12, f32::NAN], [1e6, -3.0, 2.0]];
        let out = apply(&matrix, 8_000, 128, &PcenConfig::default());
        assert_eq!(out.dim(), (2, 3));
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
