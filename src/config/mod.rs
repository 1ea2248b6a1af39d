//! Kernel configuration (ikernel.yaml)
//!
//! Loaded in layers: built-in defaults, then an optional YAML file, then
//! `IKERNEL_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, config_invalid, config_parse_failed, config_read_failed};
use crate::native::RuntimePlatform;

/// Configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "ikernel.yaml";

pub const ENV_PACKAGES_DIR: &str = "IKERNEL_PACKAGES_DIR";
pub const ENV_POLL_INTERVAL_MS: &str = "IKERNEL_POLL_INTERVAL_MS";
pub const ENV_RUNTIME_IDENTIFIER: &str = "IKERNEL_RUNTIME_IDENTIFIER";

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    /// Interval between restore progress updates
    pub poll_interval_ms: u64,

    /// Local packages folder; `~/.nuget/packages` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages_dir: Option<PathBuf>,

    /// Overrides the detected `<os>-<arch>` directory under `runtimes/`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_identifier: Option<String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            packages_dir: None,
            runtime_identifier: None,
        }
    }
}

impl KernelConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| config_read_failed(path.display().to_string(), e.to_string()))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| config_parse_failed(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then `explicit` or `./ikernel.yaml`, then environment
    ///
    /// An explicit path must exist; the working-directory file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Apply overrides looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_PACKAGES_DIR).filter(|v| !v.trim().is_empty()) {
            self.packages_dir = Some(PathBuf::from(dir));
        }
        if let Some(interval) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = interval.trim().parse().map_err(|_| {
                config_invalid(format!(
                    "{ENV_POLL_INTERVAL_MS} must be a number of milliseconds, got '{interval}'"
                ))
            })?;
        }
        if let Some(rid) = lookup(ENV_RUNTIME_IDENTIFIER).filter(|v| !v.trim().is_empty()) {
            self.runtime_identifier = Some(rid);
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(config_invalid("poll_interval_ms must be greater than zero"));
        }
        if self
            .runtime_identifier
            .as_deref()
            .is_some_and(|rid| rid.trim().is_empty() || rid.contains(['/', '\\']))
        {
            return Err(config_invalid(
                "runtime_identifier must be a single directory name",
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Packages folder, falling back to `~/.nuget/packages`
    pub fn packages_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.packages_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".nuget").join("packages"))
            .ok_or_else(|| config_invalid("could not determine home directory for packages_dir"))
    }

    pub fn runtime_platform(&self) -> RuntimePlatform {
        match &self.runtime_identifier {
            Some(rid) => RuntimePlatform::with_rid(rid.clone()),
            None => RuntimePlatform::current(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert!(config.packages_dir.is_none());
    }

    #[test]
    fn test_from_yaml() {
        let config = KernelConfig::from_yaml(
            "poll_interval_ms: 250\npackages_dir: /opt/packages\nruntime_identifier: linux-arm64\n",
        )
        .unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.packages_dir().unwrap(), PathBuf::from("/opt/packages"));
        assert_eq!(config.runtime_platform().rid(), "linux-arm64");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = KernelConfig::from_yaml("packages_dir: /p\n").unwrap();
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(KernelConfig::from_yaml("poll_interval: 5\n").is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(KernelConfig::from_yaml("poll_interval_ms: 0\n").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = KernelConfig::from_yaml("poll_interval_ms: 250\n").unwrap();
        config
            .apply_env(env(&[
                (ENV_POLL_INTERVAL_MS, "100"),
                (ENV_PACKAGES_DIR, "/env/packages"),
            ]))
            .unwrap();
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.packages_dir, Some(PathBuf::from("/env/packages")));
    }

    #[test]
    fn test_env_bad_interval() {
        let mut config = KernelConfig::default();
        let err = config
            .apply_env(env(&[(ENV_POLL_INTERVAL_MS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_from_file_errors_name_the_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ikernel.yaml");
        std::fs::write(&path, "poll_interval_ms: [").unwrap();
        let err = KernelConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, crate::error::KernelError::ConfigParseFailed { .. }));

        let missing = temp.path().join("missing.yaml");
        let err = KernelConfig::from_file(&missing).unwrap_err();
        assert!(matches!(err, crate::error::KernelError::ConfigReadFailed { .. }));
    }
}
