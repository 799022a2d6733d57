use crate::spectrogram::transform::frame_count;

/// RMS of `frame_length` samples centred on each hop position.
///
/// Column `i` is centred at `i * hop`; samples outside the buffer count as
/// silence. The column count matches the spectral transforms.
pub(super) fn rms_envelope(samples: &[f32], frame_length: usize, hop: usize) -> Vec<f32> {
    let frame_length = frame_length.max(1);
    let hop = hop.max(1);
    let half = frame_length / 2;
    let columns = frame_count(samples.len(), hop);
    (0..columns)
        .map(|col| {
            let center = col * hop;
            let start = center.saturating_sub(half).min(samples.len());
            let end = (center + frame_length - half).min(samples.len());
            let sum_sq: f64 = samples[start..end]
                .iter()
                .filter(|s| s.is_finite())
                .map(|&s| s as f64 * s as f64)
                .sum();
            (sum_sq / frame_length as f64).sqrt() as f32
        })
        .collect()
}

/// Logistic curve centred on the middle of the normalised range.
pub(super) fn sigmoid(x: f32, steepness: f32) -> f32 {
    1.0 / (1.0 + (-steepness * (x - 0.5)).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_signal_has_full_rms_away_from_edges() {
        let samples = vec![0.5_f32; 1_000];
        let env = rms_envelope(&samples, 100, 50);
        assert_eq!(env.len(), 20);
        assert!((env[10] - 0.5).abs() < 1e-6);
        // first frame is half padding
        assert!((env[0] - 0.5 * 0.5_f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn sigmoid_is_centred_at_half() {
        assert!((sigmoid(0.5, 20.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(0.0, 20.0) < 1e-3);
        assert!(sigmoid(1.0, 20.0) > 0.999);
        assert!((sigmoid(0.9, 0.0) - 0.5).abs() < 1e-6);
    }
}
