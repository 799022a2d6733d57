//! Command line spectrogram renderer.

use std::path::PathBuf;

use sonoscope::config::{self, SonoscopeConfig};
use sonoscope::logging::{self, LogOptions};
use sonoscope::pipeline::{self, RenderOptions};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct Options {
    config_path: Option<PathBuf>,
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    overlay: bool,
    export_segments: bool,
    write_default_config: bool,
    import_json: Option<PathBuf>,
    verbose: bool,
    log_dir: Option<PathBuf>,
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };

    let mut log_options = if options.verbose {
        LogOptions::verbose()
    } else {
        LogOptions::default()
    };
    log_options.log_dir = options.log_dir.clone();
    if let Err(err) = logging::init(&log_options) {
        eprintln!("File logging disabled: {err}");
    }

    let config_path = match &options.config_path {
        Some(path) => path.clone(),
        None => sonoscope::app_dirs::default_config_path().map_err(|err| err.to_string())?,
    };

    if let Some(json_path) = &options.import_json {
        let imported = config::import_legacy_json(json_path).map_err(|err| err.to_string())?;
        config::save_to_path(&imported, &config_path).map_err(|err| err.to_string())?;
        println!("Imported {} into {}", json_path.display(), config_path.display());
        return Ok(());
    }
    if options.write_default_config {
        config::save_to_path(&SonoscopeConfig::default(), &config_path)
            .map_err(|err| err.to_string())?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    }

    let config = config::load_or_default(&config_path).map_err(|err| err.to_string())?;
    let renderer = pipeline::renderer_for(&config);
    let mut render_options = RenderOptions::from_config(&config);
    if let Some(dir) = &options.output_dir {
        render_options.output_dir = dir.clone();
    }
    render_options.overlay_segments |= options.overlay;
    render_options.export_segments |= options.export_segments;

    let input = options.input.unwrap_or_else(|| config.paths.input_dir.clone());
    if input.is_file() {
        let outcome = pipeline::render_file(&input, &config, &renderer, &render_options)
            .map_err(|err| format!("{}: {err}", input.display()))?;
        println!(
            "Rendered {} ({} segments)",
            outcome.image_path.display(),
            outcome.segments.len()
        );
        return Ok(());
    }

    let report = pipeline::render_directory(&input, &config, &renderer, &render_options)
        .map_err(|err| err.to_string())?;
    for outcome in &report.rendered {
        println!("Rendered {}", outcome.image_path.display());
    }
    for (path, err) in &report.failures {
        eprintln!("Failed {}: {err}", path.display());
    }
    if report.is_clean() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} files failed",
            report.failures.len(),
            report.failures.len() + report.rendered.len()
        ))
    }
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--config" => {
                idx += 1;
                options.config_path = Some(path_value(&args, idx, "--config")?);
            }
            "--input" => {
                idx += 1;
                options.input = Some(path_value(&args, idx, "--input")?);
            }
            "--output" => {
                idx += 1;
                options.output_dir = Some(path_value(&args, idx, "--output")?);
            }
            "--import-json" => {
                idx += 1;
                options.import_json = Some(path_value(&args, idx, "--import-json")?);
            }
            "--log-dir" => {
                idx += 1;
                options.log_dir = Some(path_value(&args, idx, "--log-dir")?);
            }
            "--overlay" => options.overlay = true,
            "--export-segments" => options.export_segments = true,
            "--write-default-config" => options.write_default_config = true,
            "-v" | "--verbose" => options.verbose = true,
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok(Some(options))
}

fn path_value(args: &[String], idx: usize, flag: &str) -> Result<PathBuf, String> {
    args.get(idx)
        .map(PathBuf::from)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn help_text() -> String {
    [
        "sonoscope",
        "",
        "Render spectrogram PNGs for WAV files and detect sound events.",
        "",
        "Usage:",
        "  sonoscope [--config <path>] [--input <file-or-dir>] [--output <dir>]",
        "            [--overlay] [--export-segments]",
        "  sonoscope --write-default-config [--config <path>]",
        "  sonoscope --import-json <legacy.json> [--config <path>]",
        "",
        "Options:",
        "  --config <path>         TOML config (defaults to the app data location).",
        "  --input <path>          WAV file or directory of WAVs (defaults to paths.input_dir).",
        "  --output <dir>          Directory for PNGs (defaults to paths.output_dir).",
        "  --overlay               Outline detected segments on the image.",
        "  --export-segments       Write each detected segment as a WAV clip.",
        "  --write-default-config  Write a config with default values and exit.",
        "  --import-json <path>    Convert a legacy JSON config to TOML and exit.",
        "  --log-dir <dir>         Directory for log files.",
        "  -v, --verbose           Debug logging for this crate.",
    ]
    .join("\n")
}
