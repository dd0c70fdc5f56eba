//! Settings of the command-line tool.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML
//! configuration file, `DVBIO_*` environment variables, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use dvbio::DvbConfig;

/// Configuration file looked up in the current directory.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "dvbio.toml";

pub(crate) const ENV_DEVICE_ROOT: &str = "DVBIO_DEVICE_ROOT";
pub(crate) const ENV_ADAPTER: &str = "DVBIO_ADAPTER";
pub(crate) const ENV_FREQUENCY: &str = "DVBIO_FREQUENCY";

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("Reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("No frequency given (use --frequency, {} or [tune] frequency)", ENV_FREQUENCY)]
    MissingFrequency,
}

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub tune: TuneSection,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct DeviceSection {
    pub root: Option<PathBuf>,
    pub max_adapters: Option<usize>,
    pub wait_slice_ms: Option<u64>,
    pub adapter: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct TuneSection {
    pub frequency: Option<u64>,
}

pub(crate) fn load_config(path: &Path) -> Result<ConfigFile, SettingsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolved settings, before command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub dvb: DvbConfig,
    pub adapter: Option<PathBuf>,
    pub frequency: Option<u64>,
}

impl Settings {
    /// Load from an explicit file, or from `dvbio.toml` if it exists, then
    /// apply the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let path = explicit.map(Path::to_path_buf).or_else(|| {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            default_path.exists().then_some(default_path)
        });

        let file = match &path {
            Some(path) => {
                let file = load_config(path)?;
                info!("Loaded config from: {}", path.display());
                file
            }
            None => ConfigFile::default(),
        };

        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Merge a parsed file with environment values looked up through `env`.
    pub fn resolve<F>(file: ConfigFile, env: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut dvb = DvbConfig::default();
        if let Some(root) = file.device.root {
            dvb.device_root = root;
        }
        if let Some(max) = file.device.max_adapters {
            dvb.max_adapters = max;
        }
        if let Some(ms) = file.device.wait_slice_ms {
            dvb.wait_slice = Duration::from_millis(ms);
        }
        let mut adapter = file.device.adapter;
        let mut frequency = file.tune.frequency;

        if let Some(root) = env(ENV_DEVICE_ROOT) {
            dvb.device_root = PathBuf::from(root);
        }
        if let Some(path) = env(ENV_ADAPTER) {
            adapter = Some(PathBuf::from(path));
        }
        if let Some(value) = env(ENV_FREQUENCY) {
            let parsed = value.trim().parse().map_err(|_| SettingsError::InvalidEnv {
                name: ENV_FREQUENCY,
                value: value.clone(),
            })?;
            frequency = Some(parsed);
        }

        debug!(
            "Device root {}, {} adapter(s), wait slice {:?}",
            dvb.device_root.display(),
            dvb.max_adapters,
            dvb.wait_slice
        );

        Ok(Self {
            dvb,
            adapter,
            frequency,
        })
    }

    /// Pick the command-line frequency, falling back to the configured one.
    pub fn frequency(&self, cli: Option<u64>) -> Result<u64, SettingsError> {
        cli.or(self.frequency).ok_or(SettingsError::MissingFrequency)
    }

    /// Pick the command-line adapter, falling back to the configured one.
    pub fn adapter(&self, cli: Option<PathBuf>) -> Option<PathBuf> {
        cli.or_else(|| self.adapter.clone())
    }
}
