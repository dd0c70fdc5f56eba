//! Library configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default root of the adapter directories.
pub const DEFAULT_DEVICE_ROOT: &str = "/dev/dvb";

/// Default number of adapter indices probed by discovery and enumeration.
pub const DEFAULT_MAX_ADAPTERS: usize = 16;

/// Default length of one readiness wait slice.
pub const DEFAULT_WAIT_SLICE: Duration = Duration::from_millis(200);

/// Where to look for adapters and how long a single wait slice lasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvbConfig {
    /// Directory holding `adapter0`, `adapter1`, ...
    pub device_root: PathBuf,
    /// Candidate adapter indices are `0..max_adapters`.
    pub max_adapters: usize,
    /// A blocked read re-checks its canceller after every slice.
    pub wait_slice: Duration,
}

impl Default for DvbConfig {
    fn default() -> Self {
        Self {
            device_root: PathBuf::from(DEFAULT_DEVICE_ROOT),
            max_adapters: DEFAULT_MAX_ADAPTERS,
            wait_slice: DEFAULT_WAIT_SLICE,
        }
    }
}

impl DvbConfig {
    /// Root directory of the adapter with the given index.
    pub fn adapter_path(&self, index: usize) -> PathBuf {
        self.device_root.join(format!("adapter{}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_path() {
        let config = DvbConfig::default();
        assert_eq!(config.adapter_path(2), PathBuf::from("/dev/dvb/adapter2"));

        let config = DvbConfig {
            device_root: PathBuf::from("/tmp/fake-dvb"),
            ..DvbConfig::default()
        };
        assert_eq!(config.adapter_path(0), PathBuf::from("/tmp/fake-dvb/adapter0"));
    }
}
