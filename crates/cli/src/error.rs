//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Neither `--broadcaster` nor the configuration named a target
    #[error("No broadcasters given; pass --broadcaster or set them in a config file")]
    NoBroadcasters,

    /// Merged configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(#[from] config_loader::ConfigError),

    /// Attachment could not be read or decoded
    #[error("Failed to load image {}: {message}", path.display())]
    ImageLoad { path: PathBuf, message: String },
}

impl CliError {
    pub fn image_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ImageLoad {
            path: path.into(),
            message: message.into(),
        }
    }
}
