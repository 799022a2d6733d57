use serde::{Deserialize, Serialize};

use crate::spectrogram::TransformKind;

/// How image rows are spread over the frequency axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyScale {
    Linear,
    Logarithmic,
    /// One band per equal slice of height; for transforms whose bins are
    /// already perceptually spaced.
    Bins,
}

impl FrequencyScale {
    /// Axis for a transform; `log_frequency` only affects the linear STFT.
    pub fn for_transform(kind: TransformKind, log_frequency: bool) -> Self {
        match kind {
            TransformKind::Linear if log_frequency => Self::Logarithmic,
            TransformKind::Linear => Self::Linear,
            TransformKind::Mel | TransformKind::ConstantQ => Self::Bins,
        }
    }
}

/// Matrix row shown on each image row, top row first (highest frequency).
pub(super) fn row_lookup(frequencies: &[f32], height: u32, scale: FrequencyScale) -> Vec<usize> {
    let rows = frequencies.len();
    let height = height.max(1);
    if rows == 0 {
        return Vec::new();
    }
    let low = frequencies[0];
    let high = frequencies[rows - 1];
    (0..height)
        .map(|y| {
            // 0 on the bottom row, 1 on the top row.
            let t = if height > 1 {
                1.0 - y as f32 / (height - 1) as f32
            } else {
                0.5
            };
            match scale {
                FrequencyScale::Bins => ((t * rows as f32) as usize).min(rows - 1),
                FrequencyScale::Linear => nearest_row(frequencies, low + (high - low) * t),
                FrequencyScale::Logarithmic => {
                    let floor = frequencies
                        .iter()
                        .copied()
                        .find(|f| *f > 0.0)
                        .unwrap_or(1.0);
                    if high <= floor {
                        nearest_row(frequencies, low + (high - low) * t)
                    } else {
                        let hz = floor * (high / floor).powf(t);
                        nearest_row(frequencies, hz)
                    }
                }
            }
        })
        .collect()
}

fn nearest_row(frequencies: &[f32], hz: f32) -> usize {
    let idx = frequencies.partition_point(|f| *f < hz);
    if idx == 0 {
        return 0;
    }
    if idx >= frequencies.len() {
        return frequencies.len() - 1;
    }
    if (frequencies[idx] - hz) < (hz - frequencies[idx - 1]) {
        idx
    } else {
        idx - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_row_is_highest_frequency() {
        let freqs: Vec<f32> = (0..10).map(|i| i as f32 * 100.0).collect();
        for scale in [FrequencyScale::Linear, FrequencyScale::Logarithmic, FrequencyScale::Bins] {
            let rows = row_lookup(&freqs, 20, scale);
            assert_eq!(rows.len(), 20);
            assert_eq!(rows[0], 9, "{scale:?}");
            assert!(rows.windows(2).all(|w| w[0] >= w[1]), "{scale:?}");
        }
    }

    #[test]
    fn logarithmic_axis_gives_low_bands_more_rows() {
        let freqs: Vec<f32> = (1..=100).map(|i| i as f32 * 100.0).collect();
        let linear = row_lookup(&freqs, 100, FrequencyScale::Linear);
        let log = row_lookup(&freqs, 100, FrequencyScale::Logarithmic);
        let below_1k = |rows: &[usize]| rows.iter().filter(|r| freqs[**r] < 1_000.0).count();
        assert!(below_1k(&log) > below_1k(&linear) * 3);
    }

    #[test]
    fn transform_kind_picks_axis() {
        assert_eq!(
            FrequencyScale::for_transform(TransformKind::Mel, true),
            FrequencyScale::Bins
        );
        assert_eq!(
            FrequencyScale::for_transform(TransformKind::Linear, true),
            FrequencyScale::Logarithmic
        );
    }
}
