//! Optional user configuration read from `<data_dir>/config.toml`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_REPORT_TITLE: &str = "Daily Dragon";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Heading of the PDF report and prefix of its file name.
    pub report_title: String,
    /// Where exported reports are written. Defaults to the working directory.
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            report_title: DEFAULT_REPORT_TITLE.to_string(),
            export_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Load the config file from `data_dir`, falling back to defaults when absent.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
        tracing::debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }
}
