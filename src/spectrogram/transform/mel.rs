use ndarray::Array2;

use super::stft::bin_frequencies;

/// Triangular HTK-mel filterbank over the one-sided FFT bins.
///
/// Weights are evaluated on the continuous Hz axis and area-normalised, so
/// narrow low bands are not drowned out by wide high ones.
pub(super) struct MelBank {
    centers: Vec<f32>,
    filters: Vec<Vec<(usize, f32)>>,
}

impl MelBank {
    pub(super) fn new(
        sample_rate: u32,
        fft_size: usize,
        bands: usize,
        f_min: f32,
        f_max: f32,
    ) -> Self {
        let bands = bands.max(1);
        let edges = band_edges(bands, f_min, f_max);
        let bin_hz = bin_frequencies(fft_size, sample_rate);
        let filters = (0..bands)
            .map(|m| build_filter(&bin_hz, edges[m], edges[m + 1], edges[m + 2]))
            .collect();
        let centers = edges[1..=bands].to_vec();
        Self { centers, filters }
    }

    /// Centre frequency of each band, ascending.
    pub(super) fn centers(&self) -> &[f32] {
        &self.centers
    }

    /// Project a `(bins, frames)` spectrum onto the bands.
    pub(super) fn project(&self, spectrum: &Array2<f32>) -> Array2<f32> {
        let (_, columns) = spectrum.dim();
        let mut out = Array2::<f32>::zeros((self.filters.len(), columns));
        for (band, filter) in self.filters.iter().enumerate() {
            for col in 0..columns {
                let mut sum = 0.0_f64;
                for &(bin, weight) in filter {
                    sum += spectrum[[bin, col]].max(0.0) as f64 * weight as f64;
                }
                out[[band, col]] = sum as f32;
            }
        }
        out
    }
}

fn band_edges(bands: usize, f_min: f32, f_max: f32) -> Vec<f32> {
    let mel_min = hz_to_mel(f_min);
    let mel_max = hz_to_mel(f_max.max(f_min));
    (0..bands + 2)
        .map(|i| {
            let t = i as f32 / (bands + 1) as f32;
            mel_to_hz(mel_min + (mel_max - mel_min) * t)
        })
        .collect()
}

fn build_filter(bin_hz: &[f32], left: f32, center: f32, right: f32) -> Vec<(usize, f32)> {
    let mut weights = Vec::new();
    if right <= left {
        return weights;
    }
    let norm = 2.0 / (right - left);
    for (bin, &hz) in bin_hz.iter().enumerate() {
        if hz <= left || hz >= right {
            continue;
        }
        let w = if hz <= center {
            if center > left { (hz - left) / (center - left) } else { 0.0 }
        } else if right > center {
            (right - hz) / (right - center)
        } else {
            0.0
        };
        if w > 0.0 {
            weights.push((bin, w * norm));
        }
    }
    weights
}

pub(super) fn hz_to_mel(hz: f32) -> f32 {
    2595.0_f32 * (1.0 + hz / 700.0).log10()
}

pub(super) fn mel_to_hz(mel: f32) -> f32 {
    700.0_f32 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}
