//! Headless driver: replays an input script against the globe and prints one
//! line per painted frame.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use pulse_app::platform::PlatformDirs;
use pulse_app::{AppError, GlobeApp, HeadlessBackend, SystemClock, run_script};
use pulse_config::{CliArgs, Config};
use pulse_entities::Dataset;

const TEXTURE_WORKERS: usize = 3;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Exiting");
            eprintln!("pulse: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), AppError> {
    let dirs = match &args.config {
        Some(config_dir) => PlatformDirs {
            config_dir: config_dir.clone(),
            data_dir: config_dir.join("data"),
            log_dir: config_dir.join("logs"),
        },
        None => PlatformDirs::resolve()?,
    };

    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|err| {
        eprintln!("Failed to load config: {err}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(args);
    config.validate()?;

    pulse_log::init_logging(Some(&dirs.log_dir), config.debug.log_to_file, Some(&config));
    tracing::info!(config_dir = %dirs.config_dir.display(), "Starting stress globe");

    let dataset_path = dirs.data_path(&config.markers.dataset);
    let dataset = Dataset::load(&dataset_path)?;

    let mut app = GlobeApp::new(&config, HeadlessBackend::new(), Rc::new(SystemClock));
    app.set_dataset(dataset);
    let texture_paths = config
        .globe
        .texture_paths()
        .map(|path| dirs.data_path(&path));
    app.load_textures(texture_paths, TEXTURE_WORKERS);

    let script = read_script(args.script.as_ref())?;
    run_script(&mut app, &script)?;

    for frame in app.frames() {
        println!("{frame}");
    }
    Ok(())
}

/// Script from `path`, or stdin when no path is given.
fn read_script(path: Option<&PathBuf>) -> Result<String, AppError> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut script = String::new();
            std::io::stdin().read_to_string(&mut script)?;
            Ok(script)
        }
    }
}
