use std::f32::consts::PI;

use ndarray::Array2;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex32;

use super::stft::{fill_frame, frame_count};
use super::window::WindowKind;

pub(crate) const BINS_PER_OCTAVE: usize = 48;
/// Lowest usable analysis frequency when no positive minimum was requested.
pub(crate) const FMIN_FLOOR_HZ: f32 = 200.0;
/// Longest temporal kernel, in samples; bounds the per-frame FFT size.
pub(crate) const MAX_KERNEL_LEN: usize = 1 << 16;
/// Spectral kernel entries below this fraction of the kernel's peak are dropped.
const KERNEL_SPARSITY: f32 = 0.01;

/// Geometrically spaced bin centres from `f_min` up to (not including) `f_max`.
pub(super) fn bin_centers(f_min: f32, f_max: f32) -> Vec<f32> {
    let octaves = (f_max / f_min).log2().max(0.0);
    let bins = ((octaves * BINS_PER_OCTAVE as f32).ceil() as usize).max(1);
    (0..bins)
        .map(|k| f_min * 2.0_f32.powf(k as f32 / BINS_PER_OCTAVE as f32))
        .collect()
}

fn quality_factor() -> f32 {
    1.0 / (2.0_f32.powf(1.0 / BINS_PER_OCTAVE as f32) - 1.0)
}

/// Lowest bin centre whose kernel fits in [`MAX_KERNEL_LEN`] samples.
pub(crate) fn min_fmin(sample_rate: f32) -> f32 {
    quality_factor() * sample_rate / MAX_KERNEL_LEN as f32
}

/// Sparse spectral kernels, one per bin, evaluated against a single FFT per frame.
pub(super) struct ConstantQKernel {
    fft_len: usize,
    kernels: Vec<Vec<(usize, Complex32)>>,
}

impl ConstantQKernel {
    pub(super) fn new(sample_rate: u32, centers: &[f32], window: WindowKind) -> Self {
        let sr = sample_rate.max(1) as f32;
        let q = quality_factor();
        let lengths: Vec<usize> = centers
            .iter()
            .map(|f| ((q * sr / f.max(f32::EPSILON)).ceil() as usize).clamp(1, MAX_KERNEL_LEN))
            .collect();
        let longest = lengths.iter().copied().max().unwrap_or(1);
        let fft_len = longest.next_power_of_two();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_len);
        let mut scratch = vec![Complex32::default(); fft.get_inplace_scratch_len()];
        let mut buffer = vec![Complex32::default(); fft_len];
        let kernels = centers
            .iter()
            .zip(&lengths)
            .map(|(&freq, &len)| {
                temporal_kernel(&mut buffer, freq, len, sr, window);
                fft.process_with_scratch(&mut buffer, &mut scratch);
                sparsify(&buffer, fft_len)
            })
            .collect();
        Self { fft_len, kernels }
    }

    #[cfg(test)]
    pub(super) fn fft_len(&self) -> usize {
        self.fft_len
    }

    /// Magnitude per bin for every frame; shape `(bins, frames)`.
    ///
    /// Frames are centred where the `frame_size`-point STFT frame starting at
    /// `i * hop` is centred, so columns align across transforms.
    pub(super) fn magnitudes(
        &self,
        samples: &[f32],
        frame_size: usize,
        hop: usize,
    ) -> Array2<f32> {
        let hop = hop.max(1);
        let columns = frame_count(samples.len(), hop);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.fft_len);
        let mut scratch = vec![Complex32::default(); fft.get_inplace_scratch_len()];
        let mut frame = vec![Complex32::default(); self.fft_len];
        let mut out = Array2::<f32>::zeros((self.kernels.len(), columns));
        let lead = (frame_size / 2) as isize - (self.fft_len / 2) as isize;
        for col in 0..columns {
            let start = (col * hop) as isize + lead;
            fill_frame(&mut frame, samples, start, &[]);
            fft.process_with_scratch(&mut frame, &mut scratch);
            for (bin, kernel) in self.kernels.iter().enumerate() {
                let mut acc = Complex32::default();
                for &(idx, weight) in kernel {
                    acc += frame[idx] * weight;
                }
                out[[bin, col]] = acc.norm();
            }
        }
        out
    }
}

/// Windowed complex exponential of `len` samples, centred in `buffer`.
fn temporal_kernel(
    buffer: &mut [Complex32],
    freq: f32,
    len: usize,
    sr: f32,
    window: WindowKind,
) {
    buffer.fill(Complex32::default());
    let coeffs = window.coefficients(len);
    let start = (buffer.len() - len.min(buffer.len())) / 2;
    let norm = 1.0 / len as f32;
    for (n, w) in coeffs.iter().enumerate() {
        let t = n as f32 - len as f32 / 2.0;
        let phase = 2.0 * PI * freq * t / sr;
        buffer[start + n] = Complex32::from_polar(w * norm, phase);
    }
}

fn sparsify(spectral: &[Complex32], fft_len: usize) -> Vec<(usize, Complex32)> {
    let peak = spectral.iter().map(|c| c.norm()).fold(0.0_f32, f32::max);
    let cutoff = peak * KERNEL_SPARSITY;
    let scale = 1.0 / fft_len as f32;
    spectral
        .iter()
        .enumerate()
        .filter(|(_, c)| c.norm() > cutoff)
        .map(|(idx, c)| (idx, c.conj() * scale))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forty_eight_bins_per_octave() {
        let centers = bin_centers(200.0, 800.0);
        assert_eq!(centers.len(), 96);
        assert!((centers[48] - 400.0).abs() < 0.01);
        assert!(*centers.last().unwrap() < 800.0);
    }

    #[test]
    fn kernel_fft_len_fits_longest_kernel() {
        let centers = bin_centers(400.0, 1_600.0);
        let kernel = ConstantQKernel::new(16_000, &centers, WindowKind::Hann);
        let longest = (quality_factor() * 16_000.0 / 400.0).ceil() as usize;
        assert!(kernel.fft_len() >= longest);
        assert!(kernel.fft_len().is_power_of_two());
    }

    #[test]
    fn kernel_length_is_capped_for_very_low_centres() {
        let kernel = ConstantQKernel::new(8_000, &[0.01, 1.0], WindowKind::Hann);
        assert_eq!(kernel.fft_len(), MAX_KERNEL_LEN);
        let lowest = min_fmin(8_000.0);
        assert!((lowest - quality_factor() * 8_000.0 / 65_536.0).abs() < 1e-6);
        assert!(lowest > 8.0 && lowest < 9.0);
    }

    #[test]
    fn tone_peaks_at_matching_bin() {
        let sr = 16_000;
        let samples: Vec<f32> = (0..16_000)
            .map(|i| (2.0 * PI * 800.0 * i as f32 / sr as f32).sin())
            .collect();
        let centers = bin_centers(400.0, 1_600.0);
        let kernel = ConstantQKernel::new(sr, &centers, WindowKind::Hann);
        let mags = kernel.magnitudes(&samples, 1_024, 512);
        let column = mags.column(mags.ncols() / 2);
        let peak = column
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap();
        // 800 Hz is exactly one octave above 400 Hz.
        assert!(peak.abs_diff(BINS_PER_OCTAVE) <= 1, "peak bin {peak}");
    }
}
