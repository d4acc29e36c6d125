//! Planner configuration.
//!
//! Settings are read from `<config_dir>/drillbook/config.json` when present,
//! then overridden by environment variables:
//! - `DRILLBOOK_PORT` - HTTP port for `serve`
//! - `DRILLBOOK_DATABASE` - Path to the SQLite database
//! - `DRILLBOOK_CATALOG_URL` - Use a remote drill catalog instead of the local one
//! - `DRILLBOOK_API_KEY` - Bearer token for the remote catalog
//! - `DRILLBOOK_CATALOG_TIMEOUT_SECS` - Request timeout for the remote catalog
//! - `DRILLBOOK_DRAFT_TTL_MINUTES` - Idle time before a draft is dropped

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_DRAFT_TTL;
use crate::backend::CatalogBackend;
use crate::client::{self, CatalogClient};
use crate::db::Database;

const APP_NAME: &str = "drillbook";
const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Port for the HTTP API
    pub port: u16,
    /// SQLite database location. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Base URL of a remote drill catalog, e.g. `http://coach-hub:3000/api/v1`
    pub catalog_url: Option<String>,
    /// API key sent to the remote catalog
    pub catalog_api_key: Option<String>,
    /// Remote catalog requests fail after this many seconds
    pub catalog_timeout_secs: u64,
    /// Drafts untouched for this many minutes are discarded
    pub draft_ttl_minutes: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: None,
            catalog_url: None,
            catalog_api_key: None,
            catalog_timeout_secs: client::DEFAULT_TIMEOUT.as_secs(),
            draft_ttl_minutes: DEFAULT_DRAFT_TTL.as_secs() / 60,
        }
    }
}

impl PlannerConfig {
    /// Load from the user's config directory with environment overrides.
    /// Falls back to defaults if the file is missing or fails to parse.
    pub fn load() -> Self {
        let file = match get_config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        file.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Read a config file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, normally the process environment.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        override_parsed(&lookup, "DRILLBOOK_PORT", &mut self.port);
        if let Some(path) = lookup("DRILLBOOK_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("DRILLBOOK_CATALOG_URL").filter(|u| !u.trim().is_empty()) {
            self.catalog_url = Some(url);
        }
        if let Some(key) = lookup("DRILLBOOK_API_KEY") {
            self.catalog_api_key = Some(key);
        }
        override_parsed(
            &lookup,
            "DRILLBOOK_CATALOG_TIMEOUT_SECS",
            &mut self.catalog_timeout_secs,
        );
        override_parsed(&lookup, "DRILLBOOK_DRAFT_TTL_MINUTES", &mut self.draft_ttl_minutes);
        self
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_secs.max(1))
    }

    pub fn draft_ttl(&self) -> Duration {
        Duration::from_secs(self.draft_ttl_minutes.saturating_mul(60))
    }

    /// Save the current configuration to the user's config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Open and migrate the configured database.
    pub fn open_database(&self) -> Result<Database> {
        let db = match &self.database_path {
            Some(path) => Database::open(path.clone())?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        Ok(db)
    }

    /// Remote catalog when a URL is configured, otherwise `db`.
    pub fn catalog_backend(&self, db: &Database) -> CatalogBackend {
        match &self.catalog_url {
            Some(url) => CatalogBackend::Remote(CatalogClient::with_timeout(
                url.clone(),
                self.catalog_api_key.clone(),
                self.catalog_timeout(),
            )),
            None => CatalogBackend::Local(db.clone()),
        }
    }
}

fn override_parsed<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring invalid {}: {}", key, raw),
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlannerConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = PlannerConfig {
            port: 8080,
            database_path: Some(PathBuf::from("/tmp/plans.db")),
            catalog_url: Some("http://hub:3000/api/v1".to_string()),
            catalog_api_key: None,
            catalog_timeout_secs: 3,
            draft_ttl_minutes: 90,
        };

        config.save_to(&path).unwrap();
        assert_eq!(PlannerConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "port": 4100 }"#).unwrap();

        let config = PlannerConfig::load_from(&path).unwrap();
        assert_eq!(config.port, 4100);
        assert!(config.catalog_url.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ port: ").unwrap();
        assert!(PlannerConfig::load_from(&path).is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("DRILLBOOK_PORT", "9000"),
            ("DRILLBOOK_CATALOG_URL", "http://remote/api/v1"),
        ]
        .into_iter()
        .collect();

        let config = PlannerConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.port, 9000);
        assert_eq!(config.catalog_url.as_deref(), Some("http://remote/api/v1"));
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let config = PlannerConfig::default().with_env_overrides(|key| {
            (key == "DRILLBOOK_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn timeout_and_ttl_overrides() {
        let env: HashMap<&str, &str> = [
            ("DRILLBOOK_CATALOG_TIMEOUT_SECS", "4"),
            ("DRILLBOOK_DRAFT_TTL_MINUTES", "soon"),
        ]
        .into_iter()
        .collect();

        let config = PlannerConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.catalog_timeout(), Duration::from_secs(4));
        assert_eq!(config.draft_ttl(), DEFAULT_DRAFT_TTL);
    }

    #[test]
    fn backend_follows_catalog_url() {
        let db = Database::open_memory().unwrap();
        let local = PlannerConfig::default().catalog_backend(&db);
        assert!(matches!(local, CatalogBackend::Local(_)));

        let remote = PlannerConfig {
            catalog_url: Some("http://hub/api/v1".to_string()),
            ..PlannerConfig::default()
        }
        .catalog_backend(&db);
        assert!(matches!(remote, CatalogBackend::Remote(_)));
    }
}
