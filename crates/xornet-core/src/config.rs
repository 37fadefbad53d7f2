//! Configuration resolution for Xornet.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (explicit path, else ~/.config/xornet/fleet.json)
//! 3. Environment variables
//! 4. CLI arguments (applied by the binary, highest priority)
//!
//! The resolved [`Config`] is built once at startup and handed to the
//! components that need it; nothing reads the environment after that.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Signing secret used when none is configured. Only suitable for development.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Complete Xornet fleet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Storage connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// `SQLite` database file. `None` resolves to [`database_path`].
    pub database_path: Option<PathBuf>,
}

/// Session token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Session lifetime in seconds. `None` issues tokens without expiry.
    pub session_ttl_secs: Option<i64>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl_secs: Some(7 * 24 * 60 * 60), // 7 days
        }
    }
}

/// Background reaper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    /// Shard identifier of this instance. Only shard "1" (or no shard at all)
    /// sweeps.
    pub shard: Option<String>,
    pub interval_secs: u64,
    /// Upper bound on concurrent per-machine writes during a sweep.
    pub max_concurrency: usize,
    /// How long an in-flight sweep may keep running after shutdown is requested.
    pub shutdown_grace_secs: u64,
    /// Sweep immediately at startup instead of waiting one interval.
    pub run_on_start: bool,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            shard: None,
            interval_secs: 24 * 60 * 60,
            max_concurrency: 16,
            shutdown_grace_secs: 30,
            run_on_start: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// An explicit `path` must exist; the global default path is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => load_config_file(p)?,
        None => match global_config_path() {
            Some(global) if global.exists() => load_config_file(&global)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/xornet/fleet.json"))
    }
    #[cfg(not(target_os = "macos"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("xornet").join("fleet.json"))
    }
}

/// Default database path when none is configured.
pub fn database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".xornet").join("fleet.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("XORNET_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(val) = var("XORNET_SHARD") {
        // An empty value means "not sharded".
        config.reaper.shard = Some(val).filter(|s| !s.trim().is_empty());
    }
    if let Some(val) = var("XORNET_DB_PATH") {
        config.storage.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("XORNET_LOG_LEVEL") {
        config.log.level = val;
    }
}
