use std::io::Write;
use std::path::{Path, PathBuf};

use super::{ConfigError, PathSettings, SonoscopeConfig};

/// Load a TOML config, resolving relative paths against its directory.
pub fn load_from_path(path: &Path) -> Result<SonoscopeConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: SonoscopeConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = config.normalized();
    resolve_paths(&mut config.paths, &project_root(path));
    Ok(config)
}

/// Like [`load_from_path`], but a missing file yields defaults rooted next to it.
pub fn load_or_default(path: &Path) -> Result<SonoscopeConfig, ConfigError> {
    if path.exists() {
        return load_from_path(path);
    }
    let mut config = SonoscopeConfig::default();
    resolve_paths(&mut config.paths, &project_root(path));
    Ok(config)
}

/// Write the config as TOML, storing paths under the file's directory relative to it.
pub fn save_to_path(config: &SonoscopeConfig, path: &Path) -> Result<(), ConfigError> {
    let root = project_root(path);
    std::fs::create_dir_all(&root).map_err(|source| ConfigError::CreateDir {
        path: root.clone(),
        source,
    })?;
    let mut persisted = config.clone();
    relativize_paths(&mut persisted.paths, &root);
    let data = toml::to_string_pretty(&persisted).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, &root, data.as_bytes())
}

/// Directory relative paths in a config file are anchored to.
pub(super) fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub(super) fn resolve_paths(paths: &mut PathSettings, root: &Path) {
    for path in [&mut paths.input_dir, &mut paths.output_dir, &mut paths.segment_dir] {
        if path.is_relative() {
            *path = root.join(&*path);
        }
    }
}

fn relativize_paths(paths: &mut PathSettings, root: &Path) {
    for path in [&mut paths.input_dir, &mut paths.output_dir, &mut paths.segment_dir] {
        if let Ok(relative) = path.strip_prefix(root) {
            *path = relative.to_path_buf();
        }
    }
}

/// Write through a temp file in the target directory so a crash never leaves a partial config.
fn atomic_write(path: &Path, dir: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(data).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::{ReferencePower, TransformKind};
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sonoscope.toml");
        let mut config = load_or_default(&path).unwrap();
        config.transform.kind = TransformKind::Mel;
        config.transform.fmax = Some(9_000.0);
        config.scaling.contrast_percentile = Some(99.5);
        config.scaling.pcen.enabled = true;
        config.segmentation.sigmoid_steepness = 0.7;
        config.audio.max_duration_seconds = Some(30.0);
        config.render.width = Some(1_200);
        save_to_path(&config, &path).unwrap();

        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn max_reference_survives_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sonoscope.toml");
        let mut config = load_or_default(&path).unwrap();
        config.scaling.reference_power = ReferencePower::Max;
        config.render.colorbar = false;
        save_to_path(&config, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("reference_power = \"max\""), "{text}");
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.scaling.reference_power, ReferencePower::Max);
        assert_eq!(loaded, config);

        config.scaling.reference_power = ReferencePower::Fixed(0.25);
        save_to_path(&config, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.scaling.reference_power, ReferencePower::Fixed(0.25));
    }

    #[test]
    fn paths_are_stored_relative_and_loaded_absolute() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project").join("sonoscope.toml");
        let mut config = SonoscopeConfig::default();
        config.paths.input_dir = dir.path().join("project").join("wavs");
        config.paths.output_dir = PathBuf::from("/somewhere/else");
        save_to_path(&config, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("input_dir = \"wavs\""), "{text}");
        assert!(!text.contains("hop_length"), "{text}");

        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.paths.input_dir, dir.path().join("project").join("wavs"));
        assert_eq!(loaded.paths.output_dir, PathBuf::from("/somewhere/else"));
        assert_eq!(loaded.paths.segment_dir, dir.path().join("project").join("segments"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[transform]\nkind = \"cqt\"\nfft_size = 4096\n").unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.transform.kind, TransformKind::ConstantQ);
        assert_eq!(loaded.transform.fft_size, 4096);
        assert_eq!(loaded.transform.window, "hann");
        assert_eq!(loaded.segmentation.rms_frame_length, 1024);
    }

    #[test]
    fn malformed_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[transform\nkind = ").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }
}
