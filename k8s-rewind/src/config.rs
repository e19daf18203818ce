use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    time::Duration,
};

use k8s_rewind_core::{helpers::With, CHANGE_CAUSE_ANNOTATION};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILENAME: &str = "rewind-config";
pub const DEFAULT_REPORT_FILE: &str = "rollback-report.txt";

#[derive(Debug, Error)]
pub enum RewindConfigError {
    #[error("Io error: {}", .0)]
    IoError(std::io::Error),
    #[error("Deserialization error: {}", .0)]
    DeserializationError(serde_yaml::Error),
    #[error("Config file '{}' doesn't exist!", .0.display())]
    NotFound(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RewindConfig {
    pub annotation_key: String,
    pub report_file: PathBuf,
    pub rollout_timeout_seconds: Option<u64>,
    pub selector: Option<String>,
}

impl Default for RewindConfig {
    fn default() -> Self {
        Self {
            annotation_key: CHANGE_CAUSE_ANNOTATION.to_owned(),
            report_file: PathBuf::from(DEFAULT_REPORT_FILE),
            rollout_timeout_seconds: None,
            selector: None,
        }
    }
}

impl RewindConfig {
    /// Loads an explicitly requested config file, or the default one if it's
    /// present. Only an explicitly requested file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, RewindConfigError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(RewindConfigError::NotFound(path.to_owned()));
                }

                Self::load_from(path)
            }
            None => Self::load_default(default_config_path()),
        }
    }

    fn load_default(path: Option<PathBuf>) -> Result<Self, RewindConfigError> {
        match path {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                debug!("No config at {path:?}, using defaults");
                Ok(Self::default())
            }
            None => {
                debug!("Couldn't determine the home dir, using default config");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, RewindConfigError> {
        debug!("Used config path: {path:?}");

        let file = File::open(path).map_err(RewindConfigError::IoError)?;

        Self::from_reader(file)
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, RewindConfigError> {
        let mut raw = String::new();

        reader
            .read_to_string(&mut raw)
            .map_err(RewindConfigError::IoError)?;

        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&raw).map_err(RewindConfigError::DeserializationError)
    }

    pub fn rollout_timeout(&self) -> Option<Duration> {
        self.rollout_timeout_seconds.map(Duration::from_secs)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    home::home_dir().map(|d| d.with(|d| d.push(".kube")).with(|d| d.push(DEFAULT_CONFIG_FILENAME)))
}
