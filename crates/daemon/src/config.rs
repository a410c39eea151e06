// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration and on-disk layout

use rc_engine::{EngineConfig, RecoveryConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the state directory
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory (set RC_STATE_DIR)")]
    NoStateDir,

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Ledger file, `<state>/ledger.wal` when unset
    pub ledger_path: Option<PathBuf>,
    /// Promotion outbox, `<state>/promotions.jsonl` when unset
    pub outbox_path: Option<PathBuf>,
    /// Log file; logs go to stderr when unset
    pub log_path: Option<PathBuf>,
    pub engine: EngineConfig,
    pub recovery: RecoveryConfig,
}

impl DaemonConfig {
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load an explicit config file, or `config.toml` in the state
    /// directory when present
    pub fn load(explicit: Option<&Path>, state_dir: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = state_dir.join(CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&path, &content)
    }
}

/// Resolved file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub ledger: PathBuf,
    pub outbox: PathBuf,
    pub log: Option<PathBuf>,
    /// Lock/PID file held by `rcd run`
    pub pid: PathBuf,
}

impl Paths {
    pub fn resolve(state_dir: &Path, config: &DaemonConfig) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            ledger: config
                .ledger_path
                .clone()
                .unwrap_or_else(|| state_dir.join("ledger.wal")),
            outbox: config
                .outbox_path
                .clone()
                .unwrap_or_else(|| state_dir.join("promotions.jsonl")),
            log: config.log_path.clone(),
            pid: state_dir.join("rcd.pid"),
        }
    }
}

/// State directory: `RC_STATE_DIR`, else `$XDG_STATE_HOME/rc`, else
/// `~/.local/state/rc`
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("RC_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("rc"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/rc"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
