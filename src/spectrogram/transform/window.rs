use std::f32::consts::PI;
use std::str::FromStr;

use crate::spectrogram::TransformError;

/// Analysis window applied to every frame before the FFT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowKind {
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl FromStr for WindowKind {
    type Err = TransformError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(Self::Hann),
            "hamming" => Ok(Self::Hamming),
            "blackman" => Ok(Self::Blackman),
            "rectangular" | "boxcar" | "ones" => Ok(Self::Rectangular),
            _ => Err(TransformError::UnknownWindow {
                name: name.to_string(),
            }),
        }
    }
}

impl WindowKind {
    /// Periodic (DFT-even) window of `length` samples.
    pub fn coefficients(self, length: usize) -> Vec<f32> {
        if length <= 1 {
            return vec![1.0; length];
        }
        let n = length as f32;
        (0..length)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / n;
                match self {
                    Self::Hann => 0.5 - 0.5 * phase.cos(),
                    Self::Hamming => 0.54 - 0.46 * phase.cos(),
                    Self::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
                    Self::Rectangular => 1.0,
                }
            })
            .collect()
    }
}
