use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures reported back to whoever issued a mode command.
#[derive(Error, Debug)]
pub enum ModeError {
    #[error("No player found for '{0}'.")]
    TargetNotFound(String),

    #[error("No players to choose from.")]
    NoEligibleParticipants,

    #[error("Usage: {usage}")]
    MissingArgument { usage: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
