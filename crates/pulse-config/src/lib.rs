//! Configuration for the stress globe.
//!
//! Settings persist as `config.ron` in the platform config directory and can
//! be overridden per run from the command line.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, CameraConfig, Config, DebugConfig, GlobeConfig, InputConfig, MarkerConfig,
    SunConfig, WindowConfig,
};
pub use error::ConfigError;
