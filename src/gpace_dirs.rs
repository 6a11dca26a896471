//! Centralized application directory paths for GPAce.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/gpace/` | `~/.local/share/gpace/` |
//! | Config | `~/Library/Application Support/gpace/` | `~/.config/gpace/` |
//!
//! # Environment Overrides
//!
//! - `GPACE_DATA_DIR` overrides [`data_dir`]
//! - `GPACE_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Resolves to `dirs::data_dir()/gpace/` by default. Override with
/// the `GPACE_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("GPACE_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("gpace"))
        .unwrap_or_else(|| PathBuf::from("/tmp/gpace-data"))
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/gpace/` by default. Override with
/// the `GPACE_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("GPACE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("gpace"))
        .unwrap_or_else(|| PathBuf::from("/tmp/gpace-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default local state directory holding subjects, tasks, marks,
/// weightages and the published ranking (`data_dir()/state/`).
#[must_use]
pub fn state_dir() -> PathBuf {
    data_dir().join("state")
}
