use std::f32::consts::PI;
use std::path::Path;

pub fn write_test_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    for &sample in samples {
        writer.write_sample(sample).expect("write wav sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Silence with a sine burst over each `(start_s, end_s)` window.
pub fn tone_bursts(sample_rate: u32, seconds: f32, freq: f32, bursts: &[(f32, f32)]) -> Vec<f32> {
    let len = (seconds * sample_rate as f32) as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            if bursts.iter().any(|(start, end)| t >= *start && t < *end) {
                0.5 * (2.0 * PI * freq * t).sin()
            } else {
                0.0
            }
        })
        .collect()
}
