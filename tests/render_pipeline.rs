mod support;

use support::wav::{tone_bursts, write_test_wav};

use image::{ImageFormat, Rgba};
use sonoscope::config::{self, SonoscopeConfig};
use sonoscope::pipeline::{self, PipelineError, RenderOptions};
use sonoscope::render::COLORBAR_WIDTH;
use sonoscope::segments::SegmentationStatus;
use sonoscope::spectrogram::TransformKind;
use tempfile::TempDir;

const SR: u32 = 16_000;
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

struct Workspace {
    temp: TempDir,
    config: SonoscopeConfig,
}

impl Workspace {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("create tempdir");
        let mut config = SonoscopeConfig::default();
        config.paths.input_dir = temp.path().join("input");
        config.paths.output_dir = temp.path().join("output");
        config.paths.segment_dir = temp.path().join("segments");
        config.transform.fft_size = 1024;
        config.render.width = Some(200);
        config.render.height = Some(100);
        std::fs::create_dir_all(&config.paths.input_dir).expect("create input dir");
        Self { temp, config }
    }

    fn write_wav(&self, name: &str, samples: &[f32]) -> std::path::PathBuf {
        let path = self.config.paths.input_dir.join(name);
        write_test_wav(&path, samples, SR);
        path
    }
}

#[test]
fn directory_run_renders_each_wav_and_collects_failures() {
    let ws = Workspace::new();
    ws.write_wav("b.wav", &tone_bursts(SR, 1.0, 1_000.0, &[(0.3, 0.6)]));
    ws.write_wav("a.wav", &tone_bursts(SR, 1.0, 2_000.0, &[(0.1, 0.4)]));
    std::fs::write(ws.config.paths.input_dir.join("broken.wav"), b"not a wav").unwrap();
    std::fs::write(ws.config.paths.input_dir.join("notes.txt"), b"ignored").unwrap();

    let renderer = pipeline::renderer_for(&ws.config);
    let options = RenderOptions::from_config(&ws.config);
    let input_dir = &ws.config.paths.input_dir;
    let report = pipeline::render_directory(input_dir, &ws.config, &renderer, &options).unwrap();

    let rendered: Vec<_> = report
        .rendered
        .iter()
        .map(|outcome| outcome.image_path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(rendered, vec!["a_spectrogram.png", "b_spectrogram.png"]);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].0.ends_with("broken.wav"));
    assert!(matches!(report.failures[0].1, PipelineError::Audio(_)));
    assert!(!report.is_clean());

    for outcome in &report.rendered {
        let bytes = std::fs::read(&outcome.image_path).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200 + COLORBAR_WIDTH, 100));
        assert_eq!(outcome.segmentation_status, SegmentationStatus::Detected);
        assert_eq!(outcome.segments.len(), 1);
    }
}

#[test]
fn overlay_and_export_follow_detected_segments() {
    let mut ws = Workspace::new();
    ws.config.render.overlay_segments = true;
    ws.config.render.export_segments = true;
    let path = ws.write_wav("call.wav", &tone_bursts(SR, 1.0, 1_500.0, &[(0.2, 0.4), (0.7, 0.9)]));

    let renderer = pipeline::renderer_for(&ws.config);
    let options = RenderOptions::from_config(&ws.config);
    let outcome = pipeline::render_file(&path, &ws.config, &renderer, &options).unwrap();

    assert_eq!(outcome.segments.len(), 2);
    assert!(outcome.segments[0].end_sample <= outcome.segments[1].start_sample);
    assert_eq!(
        outcome.exported,
        vec![
            ws.config.paths.segment_dir.join("call_seg1.wav"),
            ws.config.paths.segment_dir.join("call_seg2.wav"),
        ]
    );
    for (clip, segment) in outcome.exported.iter().zip(&outcome.segments) {
        let reader = hound::WavReader::open(clip).unwrap();
        assert_eq!(reader.spec().sample_rate, SR);
        assert_eq!(reader.len() as usize, segment.duration_samples());
    }

    let image = image::open(&outcome.image_path).unwrap().to_rgba8();
    let row = 50;
    let red_left = (0..100).any(|x| *image.get_pixel(x, row) == RED);
    let red_right = (100..200).any(|x| *image.get_pixel(x, row) == RED);
    assert!(red_left && red_right);
}

#[test]
fn silent_file_renders_without_segments() {
    let mut ws = Workspace::new();
    ws.config.render.export_segments = true;
    let path = ws.write_wav("quiet.wav", &vec![0.0; SR as usize / 2]);

    let renderer = pipeline::renderer_for(&ws.config);
    let options = RenderOptions::from_config(&ws.config);
    let outcome = pipeline::render_file(&path, &ws.config, &renderer, &options).unwrap();

    assert_eq!(outcome.segmentation_status, SegmentationStatus::Silent);
    assert!(outcome.segments.is_empty());
    assert!(outcome.exported.is_empty());
    assert!(outcome.image_path.is_file());
    assert!(!ws.config.paths.segment_dir.exists());
}

#[test]
fn saved_config_drives_a_mel_pcen_render() {
    let ws = Workspace::new();
    let config_path = ws.temp.path().join("sonoscope.toml");
    let mut stored = ws.config.clone();
    stored.transform.kind = TransformKind::Mel;
    stored.transform.mel_bin_count = 64;
    stored.transform.fmax = Some(20_000.0);
    stored.scaling.pcen.enabled = true;
    stored.render.colormap = "magma".to_string();
    config::save_to_path(&stored, &config_path).unwrap();

    let loaded = config::load_from_path(&config_path).unwrap();
    let path = ws.write_wav("mel.wav", &tone_bursts(SR, 0.5, 3_000.0, &[(0.1, 0.3)]));
    let renderer = pipeline::renderer_for(&loaded);
    let options = RenderOptions::from_config(&loaded);
    let outcome = pipeline::render_file(&path, &loaded, &renderer, &options).unwrap();

    assert_eq!(outcome.bounds.fmax, 8_000.0);
    assert!(outcome.bounds.adjusted());
    assert_eq!(outcome.image_path, ws.config.paths.output_dir.join("mel_spectrogram.png"));
    assert!(outcome.image_path.is_file());
}

#[test]
fn missing_input_is_reported() {
    let ws = Workspace::new();
    let renderer = pipeline::renderer_for(&ws.config);
    let options = RenderOptions::from_config(&ws.config);
    let missing = ws.config.paths.input_dir.join("absent.wav");
    let err = pipeline::render_file(&missing, &ws.config, &renderer, &options).unwrap_err();
    assert!(matches!(err, PipelineError::Audio(_)));
    assert!(!ws.config.paths.output_dir.join("absent_spectrogram.png").exists());

    let nowhere = ws.temp.path().join("nowhere");
    let err = pipeline::render_directory(&nowhere, &ws.config, &renderer, &options).unwrap_err();
    assert!(matches!(err, PipelineError::ReadDir { .. }));
}
