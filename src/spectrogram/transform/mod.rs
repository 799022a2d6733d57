//! Time-frequency transforms: linear STFT, mel and constant-Q.

mod cqt;
mod mel;
mod stft;
mod window;

use ndarray::{Array2, s};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TransformError;
use crate::audio::SampleBuffer;

pub use window::WindowKind;

pub(crate) use stft::{frame_count, frame_times};

/// Which transform produces the magnitude matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    #[default]
    #[serde(alias = "stft")]
    Linear,
    Mel,
    #[serde(alias = "cqt")]
    ConstantQ,
}

impl TransformKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Mel => "mel",
            Self::ConstantQ => "constant_q",
        }
    }

    /// Parse the names used by configs and the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" | "stft" => Some(Self::Linear),
            "mel" => Some(Self::Mel),
            "constant_q" | "constant-q" | "cqt" => Some(Self::ConstantQ),
            _ => None,
        }
    }
}

/// Resolved inputs for one transform run.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformConfig {
    pub kind: TransformKind,
    pub fft_size: usize,
    pub hop_length: usize,
    pub window: String,
    pub fmin: Option<f32>,
    pub fmax: Option<f32>,
    pub mel_bin_count: usize,
    pub power_exponent: f32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            kind: TransformKind::Linear,
            fft_size: 2048,
            hop_length: 256,
            window: "hann".to_string(),
            fmin: None,
            fmax: None,
            mel_bin_count: 512,
            power_exponent: 2.0,
        }
    }
}

/// How the magnitudes relate to signal amplitude; drives the dB factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpectrumScale {
    Amplitude,
    Power { exponent: f32 },
}

impl SpectrumScale {
    /// Multiplier applied to `log10` when converting to decibels.
    pub fn db_factor(self) -> f32 {
        match self {
            Self::Amplitude => 20.0,
            Self::Power { exponent } => 20.0 / exponent.max(f32::EPSILON),
        }
    }
}

/// A correction applied to the requested frequency range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundsAdjustment {
    FmaxClampedToNyquist { requested: f32, nyquist: f32 },
    FminNegative { requested: f32 },
    FminAboveFmax { requested: f32, effective: f32 },
    FminFloored { effective: f32 },
}

/// The frequency range actually analysed.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyBounds {
    pub fmin: f32,
    pub fmax: f32,
    pub adjustments: Vec<BoundsAdjustment>,
}

impl FrequencyBounds {
    pub fn adjusted(&self) -> bool {
        !self.adjustments.is_empty()
    }

    /// Clamp the requested range to `[0, nyquist]` and keep `fmin < fmax`.
    ///
    /// Constant-Q analysis also keeps `fmin` high enough that the longest
    /// kernel stays within the kernel length cap for the sample rate.
    pub fn resolve(
        fmin: Option<f32>,
        fmax: Option<f32>,
        nyquist: f32,
        kind: TransformKind,
    ) -> Self {
        let mut adjustments = Vec::new();
        let nyquist = nyquist.max(f32::EPSILON);
        let mut hi = match fmax.filter(|v| v.is_finite()) {
            Some(requested) if requested > nyquist => {
                adjustments.push(BoundsAdjustment::FmaxClampedToNyquist { requested, nyquist });
                nyquist
            }
            Some(requested) if requested > 0.0 => requested,
            _ => nyquist,
        };
        let mut lo = match fmin.filter(|v| v.is_finite()) {
            Some(requested) if requested < 0.0 => {
                adjustments.push(BoundsAdjustment::FminNegative { requested });
                0.0
            }
            Some(requested) => requested,
            None => 0.0,
        };
        if lo >= hi {
            let effective = (hi * 0.5).max(0.0);
            adjustments.push(BoundsAdjustment::FminAboveFmax { requested: lo, effective });
            lo = effective;
        }
        if kind == TransformKind::ConstantQ {
            if lo <= 0.0 {
                let effective = cqt::FMIN_FLOOR_HZ.min(hi * 0.5);
                adjustments.push(BoundsAdjustment::FminFloored { effective });
                lo = effective;
            }
            let lowest = cqt::min_fmin(nyquist * 2.0);
            if lo < lowest {
                adjustments.push(BoundsAdjustment::FminFloored { effective: lowest });
                lo = lowest;
            }
        }
        if hi <= lo {
            hi = nyquist;
        }
        Self {
            fmin: lo,
            fmax: hi,
            adjustments,
        }
    }
}

/// Output of a transform: magnitudes indexed `[frequency, frame]`.
#[derive(Clone, Debug)]
pub struct TransformOutput {
    pub kind: TransformKind,
    pub frequencies: Vec<f32>,
    pub times: Vec<f32>,
    pub magnitudes: Array2<f32>,
    pub scale: SpectrumScale,
    pub bounds: FrequencyBounds,
    pub hop_length: usize,
    pub sample_rate: u32,
}

fn validate(config: &TransformConfig) -> Result<WindowKind, TransformError> {
    if config.fft_size == 0 {
        return Err(TransformError::InvalidFftSize);
    }
    if config.hop_length == 0 {
        return Err(TransformError::InvalidHopLength);
    }
    if config.hop_length > config.fft_size {
        return Err(TransformError::HopExceedsFftSize {
            hop_length: config.hop_length,
            fft_size: config.fft_size,
        });
    }
    if config.kind == TransformKind::Mel {
        if config.mel_bin_count == 0 {
            return Err(TransformError::InvalidMelBinCount);
        }
        if !config.power_exponent.is_finite() || config.power_exponent <= 0.0 {
            return Err(TransformError::InvalidPowerExponent {
                value: config.power_exponent,
            });
        }
    }
    config.window.parse()
}

/// Run the configured transform over `buffer`.
///
/// Shape problems are returned as [`TransformError`]; out-of-range frequency
/// bounds are corrected and reported through [`FrequencyBounds`].
pub fn compute(
    buffer: &SampleBuffer,
    config: &TransformConfig,
) -> Result<TransformOutput, TransformError> {
    let window = validate(config)?;
    let sample_rate = buffer.sample_rate();
    let bounds = FrequencyBounds::resolve(config.fmin, config.fmax, buffer.nyquist(), config.kind);
    for adjustment in &bounds.adjustments {
        warn!(?adjustment, "frequency bounds adjusted");
    }
    let samples = buffer.samples();
    let hop = config.hop_length;
    let (frequencies, magnitudes, scale) = match config.kind {
        TransformKind::Linear => {
            let coeffs = window.coefficients(config.fft_size);
            let full = stft::spectrum(samples, config.fft_size, hop, &coeffs, 1.0);
            let bins = stft::bin_frequencies(config.fft_size, sample_rate);
            let lo = bins.partition_point(|f| *f < bounds.fmin);
            let hi = bins.partition_point(|f| *f <= bounds.fmax).max(lo);
            let kept = full.slice(s![lo..hi, ..]).to_owned();
            (bins[lo..hi].to_vec(), kept, SpectrumScale::Amplitude)
        }
        TransformKind::Mel => {
            let coeffs = window.coefficients(config.fft_size);
            let power =
                stft::spectrum(samples, config.fft_size, hop, &coeffs, config.power_exponent);
            let bank = mel::MelBank::new(
                sample_rate,
                config.fft_size,
                config.mel_bin_count,
                bounds.fmin,
                bounds.fmax,
            );
            let projected = bank.project(&power);
            (
                bank.centers().to_vec(),
                projected,
                SpectrumScale::Power {
                    exponent: config.power_exponent,
                },
            )
        }
        TransformKind::ConstantQ => {
            let centers = cqt::bin_centers(bounds.fmin, bounds.fmax);
            let kernel = cqt::ConstantQKernel::new(sample_rate, &centers, window);
            let mags = kernel.magnitudes(samples, config.fft_size, hop);
            (centers, mags, SpectrumScale::Amplitude)
        }
    };
    let times = frame_times(magnitudes.ncols(), hop, sample_rate);
    debug!(
        kind = config.kind.as_str(),
        rows = magnitudes.nrows(),
        columns = magnitudes.ncols(),
        fmin = bounds.fmin,
        fmax = bounds.fmax,
        "transform complete"
    );
    Ok(TransformOutput {
        kind: config.kind,
        frequencies,
        times,
        magnitudes,
        scale,
        bounds,
        hop_length: hop,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> SampleBuffer {
        let len = (sample_rate as f32 * seconds) as usize;
        let samples: Vec<f32> = (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        SampleBuffer::new(samples, sample_rate)
    }

    fn loudest_frequency(output: &TransformOutput) -> f32 {
        let row = (0..output.magnitudes.nrows())
            .max_by(|a, b| {
                let ea: f32 = output.magnitudes.row(*a).sum();
                let eb: f32 = output.magnitudes.row(*b).sum();
                ea.total_cmp(&eb)
            })
            .unwrap();
        output.frequencies[row]
    }

    #[test]
    fn linear_sine_respects_bounds_and_peaks_at_tone() {
        let buffer = sine(1_000.0, 24_000, 1.0);
        let config = TransformConfig {
            fft_size: 2048,
            hop_length: 512,
            fmin: Some(500.0),
            fmax: Some(2_000.0),
            ..TransformConfig::default()
        };
        let output = compute(&buffer, &config).unwrap();
        assert!(output.frequencies[0] >= 500.0);
        assert!(*output.frequencies.last().unwrap() <= 2_000.0);
        assert!(output.frequencies.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(output.magnitudes.nrows(), output.frequencies.len());
        assert_eq!(output.magnitudes.ncols(), output.times.len());
        assert_eq!(output.times.len(), frame_count(24_000, 512));
        let peak = loudest_frequency(&output);
        assert!((peak - 1_000.0).abs() <= 24_000.0 / 2048.0, "peak at {peak}");
        assert!(!output.bounds.adjusted());
    }

    #[test]
    fn mel_reports_power_scale_and_peaks_near_tone() {
        let buffer = sine(2_000.0, 16_000, 0.5);
        let config = TransformConfig {
            kind: TransformKind::Mel,
            fft_size: 1024,
            hop_length: 256,
            mel_bin_count: 64,
            ..TransformConfig::default()
        };
        let output = compute(&buffer, &config).unwrap();
        assert_eq!(output.frequencies.len(), 64);
        assert_eq!(output.scale, SpectrumScale::Power { exponent: 2.0 });
        assert!((output.scale.db_factor() - 10.0).abs() < 1e-6);
        let peak = loudest_frequency(&output);
        assert!((peak - 2_000.0).abs() < 250.0, "peak at {peak}");
    }

    #[test]
    fn constant_q_floors_missing_fmin() {
        let buffer = sine(440.0, 8_000, 0.5);
        let config = TransformConfig {
            kind: TransformKind::ConstantQ,
            fft_size: 1024,
            hop_length: 256,
            fmax: Some(1_600.0),
            ..TransformConfig::default()
        };
        let output = compute(&buffer, &config).unwrap();
        assert!((output.bounds.fmin - 200.0).abs() < 1e-3);
        assert!(output.bounds.adjusted());
        assert!((143..=145).contains(&output.frequencies.len()));
        assert!(output.magnitudes.iter().all(|v| v.is_finite()));
        let peak = loudest_frequency(&output);
        assert!((peak / 440.0).log2().abs() < 2.0 / 48.0, "peak at {peak}");
    }

    #[test]
    fn tiny_positive_constant_q_fmin_is_raised_to_kernel_cap() {
        let lowest = cqt::min_fmin(8_000.0);
        let bounds =
            FrequencyBounds::resolve(Some(1e-4), Some(20.0), 4_000.0, TransformKind::ConstantQ);
        assert_eq!(bounds.fmin, lowest);
        assert_eq!(bounds.fmax, 20.0);
        assert_eq!(
            bounds.adjustments,
            vec![BoundsAdjustment::FminFloored { effective: lowest }]
        );

        let untouched =
            FrequencyBounds::resolve(Some(50.0), Some(400.0), 4_000.0, TransformKind::ConstantQ);
        assert!(!untouched.adjusted());

        let buffer = sine(12.0, 8_000, 0.25);
        let config = TransformConfig {
            kind: TransformKind::ConstantQ,
            fft_size: 512,
            hop_length: 256,
            fmin: Some(1e-4),
            fmax: Some(20.0),
            ..TransformConfig::default()
        };
        let output = compute(&buffer, &config).unwrap();
        assert_eq!(output.bounds.fmin, lowest);
        assert!(output.frequencies[0] >= lowest);
        assert!(output.magnitudes.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn fmax_above_nyquist_is_clamped_and_reported() {
        let buffer = sine(500.0, 8_000, 0.25);
        let config = TransformConfig {
            fft_size: 256,
            hop_length: 128,
            fmax: Some(20_000.0),
            ..TransformConfig::default()
        };
        let output = compute(&buffer, &config).unwrap();
        assert_eq!(output.bounds.fmax, 4_000.0);
        assert!(matches!(
            output.bounds.adjustments[0],
            BoundsAdjustment::FmaxClampedToNyquist { .. }
        ));
        assert_eq!(*output.frequencies.last().unwrap(), 4_000.0);
    }

    #[test]
    fn inverted_bounds_lower_fmin() {
        let bounds =
            FrequencyBounds::resolve(Some(3_000.0), Some(1_000.0), 4_000.0, TransformKind::Linear);
        assert_eq!(bounds.fmin, 500.0);
        assert_eq!(bounds.fmax, 1_000.0);
        assert!(bounds.adjusted());
    }

    #[test]
    fn empty_buffer_yields_a_single_silent_column() {
        let buffer = SampleBuffer::new(Vec::<f32>::new(), 8_000);
        let output = compute(&buffer, &TransformConfig::default()).unwrap();
        assert_eq!(output.times, vec![0.0]);
        assert!(output.magnitudes.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn shape_errors_are_rejected() {
        let buffer = sine(500.0, 8_000, 0.1);
        let mut config = TransformConfig {
            fft_size: 0,
            ..TransformConfig::default()
        };
        assert_eq!(compute(&buffer, &config).unwrap_err(), TransformError::InvalidFftSize);
        config.fft_size = 256;
        config.hop_length = 0;
        assert_eq!(compute(&buffer, &config).unwrap_err(), TransformError::InvalidHopLength);
        config.hop_length = 512;
        assert!(matches!(
            compute(&buffer, &config).unwrap_err(),
            TransformError::HopExceedsFftSize { .. }
        ));
        config.hop_length = 128;
        config.window = "triangle-ish".to_string();
        assert!(matches!(
            compute(&buffer, &config).unwrap_err(),
            TransformError::UnknownWindow { .. }
        ));
        config.window = "hann".to_string();
        config.kind = TransformKind::Mel;
        config.mel_bin_count = 0;
        assert_eq!(compute(&buffer, &config).unwrap_err(), TransformError::InvalidMelBinCount);
    }
}
