//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Stress globe command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "pulse", about = "Interactive stress globe (headless driver)")]
pub struct CliArgs {
    /// Viewport width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Feature dataset (JSON array or GeoJSON FeatureCollection).
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Directory holding the globe textures.
    #[arg(long)]
    pub textures: Option<PathBuf>,

    /// Initial threshold control position in [0, 1].
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Event script to run. Reads stdin when omitted.
    pub script: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(ref dataset) = args.dataset {
            self.markers.dataset = dataset.clone();
        }
        if let Some(ref dir) = args.textures {
            self.globe.texture_dir = dir.clone();
        }
        if let Some(control) = args.threshold {
            self.markers.threshold_control = control;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
