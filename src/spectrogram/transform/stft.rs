use ndarray::Array2;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex32;

/// Number of analysis columns for `len` samples at `hop`.
///
/// Every transform and the RMS envelope share this so their columns line up.
pub(crate) fn frame_count(len: usize, hop: usize) -> usize {
    len.div_ceil(hop.max(1)).max(1)
}

/// Start time in seconds of each column.
pub(crate) fn frame_times(columns: usize, hop: usize, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate.max(1) as f64;
    (0..columns)
        .map(|i| ((i * hop) as f64 / sr) as f32)
        .collect()
}

/// Centre frequency in Hz of each one-sided FFT bin.
pub(super) fn bin_frequencies(fft_size: usize, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate.max(1) as f32;
    (0..=fft_size / 2)
        .map(|k| k as f32 * sr / fft_size as f32)
        .collect()
}

/// Copy `[start, start + frame.len())` of `samples` into `frame`, zero-padding
/// outside the signal. `start` may be negative.
pub(super) fn fill_frame(frame: &mut [Complex32], samples: &[f32], start: isize, window: &[f32]) {
    for (offset, slot) in frame.iter_mut().enumerate() {
        let idx = start + offset as isize;
        let sample = if idx >= 0 {
            samples.get(idx as usize).copied().unwrap_or(0.0)
        } else {
            0.0
        };
        let sample = if sample.is_finite() { sample } else { 0.0 };
        let w = window.get(offset).copied().unwrap_or(1.0);
        *slot = Complex32::new(sample * w, 0.0);
    }
}

/// One-sided `|X|^exponent` for every frame; shape `(fft_size / 2 + 1, frames)`.
pub(super) fn spectrum(
    samples: &[f32],
    fft_size: usize,
    hop: usize,
    window: &[f32],
    exponent: f32,
) -> Array2<f32> {
    let fft_size = fft_size.max(1);
    let hop = hop.max(1);
    let bins = fft_size / 2 + 1;
    let columns = frame_count(samples.len(), hop);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let mut frame = vec![Complex32::default(); fft_size];
    let mut scratch = vec![Complex32::default(); fft.get_inplace_scratch_len()];
    let mut out = Array2::<f32>::zeros((bins, columns));
    for col in 0..columns {
        fill_frame(&mut frame, samples, (col * hop) as isize, window);
        fft.process_with_scratch(&mut frame, &mut scratch);
        for (bin, value) in frame.iter().take(bins).enumerate() {
            out[[bin, col]] = apply_exponent(*value, exponent);
        }
    }
    out
}

fn apply_exponent(value: Complex32, exponent: f32) -> f32 {
    if exponent == 1.0 {
        value.norm()
    } else if exponent == 2.0 {
        value.norm_sqr()
    } else {
        value.norm().powf(exponent)
    }
}
