//! Configuration types for the priority engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PriorityError, Result};

/// Top-level configuration for the priority engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Isolated worker dispatch settings.
    pub dispatch: DispatchConfig,
    /// Local state and published ranking location.
    pub store: StoreConfig,
    /// Periodic recomputation settings.
    pub schedule: ScheduleConfig,
    /// In-process update broadcast settings.
    pub broadcast: BroadcastConfig,
    /// Remote ranking mirror settings.
    pub mirror: MirrorConfig,
}

/// Worker dispatch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on waiting for a worker, in seconds. `None` waits forever.
    pub timeout_secs: Option<u64>,
    /// Name given to each worker thread.
    pub thread_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            thread_name: "gpace-priority-worker".to_owned(),
        }
    }
}

/// Result store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// State directory (None = `gpace_dirs::state_dir()`).
    pub state_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// The configured state directory, or the platform default.
    #[must_use]
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(crate::gpace_dirs::state_dir)
    }
}

/// Recomputation schedule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between periodic recomputations.
    pub interval_secs: u64,
    /// Buffered recompute triggers before senders wait.
    pub trigger_capacity: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            trigger_capacity: 32,
        }
    }
}

/// Broadcast channel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Events buffered per subscriber before the slowest one lags.
    pub capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// Remote mirror configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Push every published record to `endpoint`.
    pub enabled: bool,
    /// Full URL of the mirrored ranking document.
    pub endpoint: Option<String>,
    /// Optional bearer token sent with every request.
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            auth_token: None,
            timeout_secs: 10,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PriorityError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::from_file(path) {
            Ok(config) => Ok(config),
            Err(PriorityError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PriorityError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PriorityError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.timeout_secs == Some(0) {
            return Err(PriorityError::Config(
                "dispatch.timeout_secs must be greater than 0 when set".into(),
            ));
        }
        if self.dispatch.thread_name.trim().is_empty() {
            return Err(PriorityError::Config(
                "dispatch.thread_name cannot be empty".into(),
            ));
        }
        if self.schedule.interval_secs == 0 {
            return Err(PriorityError::Config(
                "schedule.interval_secs must be greater than 0".into(),
            ));
        }
        if self.broadcast.capacity == 0 {
            return Err(PriorityError::Config(
                "broadcast.capacity must be greater than 0".into(),
            ));
        }
        if self.mirror.enabled {
            let endpoint = self.mirror.endpoint.as_deref().unwrap_or("").trim();
            if endpoint.is_empty() {
                return Err(PriorityError::Config(
                    "mirror.endpoint is required when the mirror is enabled".into(),
                ));
            }
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(PriorityError::Config(format!(
                    "mirror.endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
            if self.mirror.timeout_secs == 0 {
                return Err(PriorityError::Config(
                    "mirror.timeout_secs must be greater than 0".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule.interval_secs, 600);
        assert!(config.dispatch.timeout_secs.is_none());
        assert!(!config.mirror.enabled);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = EngineConfig::default();
        config.dispatch.timeout_secs = Some(30);
        config.schedule.interval_secs = 120;
        config.mirror.enabled = true;
        config.mirror.endpoint = Some("https://sync.example.com/rankings/me".into());

        config.save_to_file(&path).unwrap();
        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [schedule]
            interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.schedule.interval_secs, 60);
        assert_eq!(config.schedule.trigger_capacity, 32);
        assert_eq!(config.broadcast.capacity, 64);
        assert_eq!(config.dispatch.thread_name, "gpace-priority-worker");
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        let err = EngineConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, PriorityError::Config(_)));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = EngineConfig::default();
        config.schedule.interval_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("schedule.interval_secs"), "{err}");
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = EngineConfig::default();
        config.dispatch.timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_mirror_endpoint() {
        let mut config = EngineConfig::default();
        config.mirror.enabled = true;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("mirror.endpoint"), "{err}");

        config.mirror.endpoint = Some("ftp://example.com".into());
        assert!(config.validate().is_err());

        config.mirror.endpoint = Some("http://localhost:8080/r".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn store_dir_override_is_used() {
        let config: EngineConfig = toml::from_str(
            r#"
            [store]
            state_dir = "/srv/gpace/state"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.store.resolved_state_dir(),
            PathBuf::from("/srv/gpace/state")
        );
    }
}
