use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Shared admin key. When set, matching `admin_key` query parameters
    /// unlock raw client addresses in detail views. Unset disables that.
    #[serde(default)]
    pub admin_key: Option<String>,
    /// Secret folded into the daily fingerprint salt. If not set, a random
    /// secret is generated at startup (fingerprints then change on restart).
    #[serde(default)]
    pub secret: Option<String>,
    /// Days of uniqueness-ledger history to keep. 0 = never prune.
    #[serde(default = "default_ledger_retention_days")]
    pub ledger_retention_days: u32,
    /// How often the ledger prune task runs.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/petrel.duckdb")
}

const fn default_ledger_retention_days() -> u32 {
    7
}

const fn default_prune_interval_secs() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            admin_key: None,
            secret: None,
            ledger_retention_days: default_ledger_retention_days(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `PETREL_HOST` → host
    /// - `PETREL_PORT` → port
    /// - `PETREL_DB_PATH` → db_path
    /// - `PETREL_ADMIN_KEY` → admin_key
    /// - `PETREL_SECRET` → secret
    /// - `PETREL_LEDGER_RETENTION_DAYS` → ledger_retention_days
    /// - `PETREL_PRUNE_INTERVAL` → prune_interval_secs
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        if let Ok(host) = std::env::var("PETREL_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PETREL_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(path) = std::env::var("PETREL_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(key) = std::env::var("PETREL_ADMIN_KEY") {
            config.admin_key = Some(key);
        }
        if let Ok(secret) = std::env::var("PETREL_SECRET") {
            config.secret = Some(secret);
        }
        if let Ok(val) = std::env::var("PETREL_LEDGER_RETENTION_DAYS") {
            if let Ok(d) = val.parse() {
                config.ledger_retention_days = d;
            }
        }
        if let Ok(val) = std::env::var("PETREL_PRUNE_INTERVAL") {
            if let Ok(i) = val.parse() {
                config.prune_interval_secs = i;
            }
        }

        config
    }
}
