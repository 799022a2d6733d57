use std::sync::Arc;

/// Mono `f32` samples plus their sample rate.
///
/// Cloning is cheap; the samples are shared and never mutated after decode.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap decoded mono samples. A zero sample rate is bumped to 1 Hz so time
    /// conversions never divide by zero.
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 * 0.5
    }

    /// Duration of the buffer in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Apply the maximum-duration policy, keeping the first
    /// `floor(max_seconds * sample_rate)` samples.
    ///
    /// `None`, non-finite, or non-positive limits leave the buffer untouched.
    pub fn truncated(&self, max_seconds: Option<f64>) -> Self {
        let Some(max_seconds) = max_seconds.filter(|s| s.is_finite() && *s > 0.0) else {
            return self.clone();
        };
        let max_samples = (max_seconds * self.sample_rate as f64).floor() as usize;
        if max_samples >= self.samples.len() {
            return self.clone();
        }
        Self {
            samples: Arc::from(&self.samples[..max_samples]),
            sample_rate: self.sample_rate,
        }
    }

    /// Borrow `[start, end)` clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> &[f32] {
        let end = end.min(self.samples.len());
        let start = start.min(end);
        &self.samples[start..end]
    }
}
