//! Event detection from a soft-thresholded RMS envelope.

mod envelope;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::SampleBuffer;
use envelope::{rms_envelope, sigmoid};

/// Peak RMS below this is treated as a silent clip.
const SILENCE_RMS: f32 = 1e-6;

/// A detected event, `[start_sample, end_sample)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub start_sample: usize,
    pub end_sample: usize,
}

impl Segment {
    /// `None` unless `start < end`.
    pub fn new(start_sample: usize, end_sample: usize) -> Option<Self> {
        (start_sample < end_sample).then_some(Self {
            start_sample,
            end_sample,
        })
    }

    pub fn start_time(&self, sample_rate: u32) -> f64 {
        self.start_sample as f64 / sample_rate.max(1) as f64
    }

    pub fn end_time(&self, sample_rate: u32) -> f64 {
        self.end_sample as f64 / sample_rate.max(1) as f64
    }

    pub fn duration_samples(&self) -> usize {
        self.end_sample - self.start_sample
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_rms_frame_length")]
    pub rms_frame_length: usize,
    /// Activation cutoff on the sigmoid output, in `[0, 1]`.
    #[serde(default = "default_rms_threshold")]
    pub rms_threshold: f32,
    /// Steepness of the soft threshold. Purely a shaping value; no range is
    /// assumed.
    #[serde(default = "default_sigmoid_steepness")]
    pub sigmoid_steepness: f32,
    #[serde(default = "default_min_duration")]
    pub min_segment_duration_s: f32,
    #[serde(default = "default_min_duration")]
    pub min_silence_duration_s: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            rms_frame_length: default_rms_frame_length(),
            rms_threshold: default_rms_threshold(),
            sigmoid_steepness: default_sigmoid_steepness(),
            min_segment_duration_s: default_min_duration(),
            min_silence_duration_s: default_min_duration(),
        }
    }
}

fn default_rms_frame_length() -> usize {
    1024
}

fn default_rms_threshold() -> f32 {
    0.2
}

fn default_sigmoid_steepness() -> f32 {
    20.0
}

fn default_min_duration() -> f32 {
    0.05
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentationStatus {
    Detected,
    /// The envelope peak was too small to normalise; no segments were produced.
    Silent,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    pub status: SegmentationStatus,
}

impl Segmentation {
    fn silent() -> Self {
        Self {
            segments: Vec::new(),
            status: SegmentationStatus::Silent,
        }
    }
}

/// Detect events in `buffer` using the same hop as the spectral transform.
pub fn detect(
    buffer: &SampleBuffer,
    config: &SegmentationConfig,
    hop_length: usize,
) -> Segmentation {
    let hop = hop_length.max(1);
    let rms = rms_envelope(buffer.samples(), config.rms_frame_length, hop);
    let peak = rms.iter().copied().fold(0.0_f32, f32::max);
    if peak.is_nan() || peak < SILENCE_RMS {
        warn!(peak, "envelope is silent, no segments detected");
        return Segmentation::silent();
    }
    let active: Vec<bool> = rms
        .iter()
        .map(|&v| sigmoid(v / peak, config.sigmoid_steepness) > config.rms_threshold)
        .collect();
    let sr = buffer.sample_rate() as f32;
    let min_samples = duration_to_samples(config.min_segment_duration_s, sr);
    let min_silence = duration_to_samples(config.min_silence_duration_s, sr);
    let segments = walk(&active, hop, buffer.len(), min_samples, min_silence);
    debug!(
        frames = active.len(),
        segments = segments.len(),
        "segment detection complete"
    );
    Segmentation {
        segments,
        status: SegmentationStatus::Detected,
    }
}

fn duration_to_samples(seconds: f32, sample_rate: f32) -> usize {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * sample_rate).floor() as usize
    } else {
        0
    }
}

/// Two-state walk over per-frame activity.
fn walk(
    active: &[bool],
    hop: usize,
    len: usize,
    min_samples: usize,
    min_silence: usize,
) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut open: Option<usize> = None;
    for (frame, &is_active) in active.iter().enumerate() {
        let position = frame * hop;
        match (open, is_active) {
            (None, true) => open = Some(position),
            (Some(start), false) => {
                accept(&mut segments, start, position, min_samples, min_silence);
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        accept(&mut segments, start, len, min_samples, min_silence);
    }
    segments
}

fn accept(
    segments: &mut Vec<Segment>,
    start: usize,
    end: usize,
    min_samples: usize,
    min_silence: usize,
) {
    let Some(candidate) = Segment::new(start, end) else {
        return;
    };
    if candidate.duration_samples() < min_samples {
        return;
    }
    match segments.last_mut() {
        Some(prev) if candidate.start_sample.saturating_sub(prev.end_sample) < min_silence => {
            prev.end_sample = candidate.end_sample;
        }
        _ => segments.push(candidate),
    }
}
