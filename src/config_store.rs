use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::Config;
use crate::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use crate::error::ConfigError;

pub struct ConfigStore {
    file_path: PathBuf,
}

impl ConfigStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn from_env() -> Self {
        let file_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::new(file_path)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Reads the document, writing a default one first when none exists.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let text = match fs::read_to_string(&self.file_path) {
            Ok(value) => value,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                self.save(&config)?;
                info!(path = %self.file_path.display(), "created default config");
                return Ok(config);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.file_path.clone(),
                    source,
                })
            }
        };

        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: self.file_path.clone(),
            source,
        })?;
        info!(path = %self.file_path.display(), "loaded config");
        Ok(config.sanitized())
    }

    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(err) => {
                error!(%err, "failed to load config, using defaults");
                Config::default()
            }
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let text = serde_json::to_string_pretty(config)?;
        fs::write(&self.file_path, text).map_err(|source| ConfigError::Io {
            path: self.file_path.clone(),
            source,
        })
    }
}
