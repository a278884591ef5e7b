//! Top-level application error.

use pulse_config::ConfigError;
use pulse_entities::DatasetError;

use crate::platform::PlatformError;
use crate::script::ScriptError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load dataset: {0}")]
    Dataset(#[from] DatasetError),

    #[error("invalid input script: {0}")]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
