//! Loading and validation for `CollectorConfig`
//!
//! Precedence, lowest first: built-in defaults, JSON config file,
//! `FANLEDGER_*` environment variables, command-line flags.

use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};

use super::types::{CollectorConfig, DataSource};

/// Environment variables read by [`CollectorConfig::apply_env_overrides`]
pub const ENV_PROFILE_ID: &str = "FANLEDGER_PROFILE_ID";
pub const ENV_BROKER_URL: &str = "FANLEDGER_BROKER_URL";
pub const ENV_DATABASE_PATH: &str = "FANLEDGER_DATABASE";
pub const ENV_BIND_ADDR: &str = "FANLEDGER_BIND";

impl CollectorConfig {
    /// Read a (possibly partial) JSON config file on top of the defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CollectorConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply `FANLEDGER_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup(ENV_PROFILE_ID) {
            self.profile_id = id.trim().to_string();
        }
        if let Some(url) = lookup(ENV_BROKER_URL) {
            self.broker_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.bind_addr = addr;
        }
    }

    /// Override the profile id (command-line flag)
    pub fn set_profile_id(&mut self, id: impl Into<String>) {
        self.profile_id = id.into().trim().to_string();
    }

    pub fn set_database_path(&mut self, path: impl Into<PathBuf>) {
        self.database_path = path.into();
    }

    pub fn set_bind_addr(&mut self, addr: impl Into<String>) {
        self.bind_addr = addr.into();
    }

    pub fn set_run_on_startup(&mut self, run: bool) {
        self.run_on_startup = run;
    }

    /// Check the invariants the collector relies on
    pub fn validate(&self) -> Result<()> {
        if self.profile_id.is_empty() {
            bail!("profile_id must be set (config file, {ENV_PROFILE_ID} or --profile)");
        }

        url::Url::parse(&self.broker_url)
            .map_err(|e| anyhow!("Invalid broker_url '{}': {e}", self.broker_url))?;
        url::Url::parse(&self.platform_root_url)
            .map_err(|e| anyhow!("Invalid platform_root_url '{}': {e}", self.platform_root_url))?;
        for source in DataSource::ALL {
            let url = self.source_url(source);
            url::Url::parse(url).map_err(|e| anyhow!("Invalid {source} url '{url}': {e}"))?;
        }

        if self.auth_timeout_secs == 0 || self.element_timeout_secs == 0 {
            bail!("auth_timeout_secs and element_timeout_secs must be greater than zero");
        }
        if self.health_timeout_secs == 0 || self.start_timeout_secs == 0 {
            bail!("health_timeout_secs and start_timeout_secs must be greater than zero");
        }
        if self.max_scroll_iterations == 0 {
            bail!("max_scroll_iterations must be greater than zero");
        }
        if let Some(hour) = self.schedule_hours.iter().find(|h| **h > 23) {
            bail!("schedule hour {hour} is out of range 0-23");
        }
        if self.database_path.as_os_str().is_empty() {
            bail!("database_path must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CollectorConfig {
        CollectorConfig::builder()
            .profile_id("kxrosvb")
            .database_path("test.db")
            .build()
            .expect("valid config")
    }

    #[test]
    fn builder_trims_profile_and_broker_url() {
        let config = CollectorConfig::builder()
            .broker_url("http://localhost:50325/")
            .profile_id("  abc  ")
            .database_path("x.db")
            .build()
            .expect("valid config");
        assert_eq!(config.profile_id(), "abc");
        assert_eq!(config.start_url(), "http://localhost:50325/api/v1/browser/start");
    }

    #[test]
    fn empty_profile_is_rejected() {
        let result = CollectorConfig::builder()
            .profile_id("   ")
            .database_path("x.db")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn schedule_hour_out_of_range_is_rejected() {
        let result = CollectorConfig::builder()
            .profile_id("abc")
            .database_path("x.db")
            .schedule_hours(vec![8, 24])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn zero_scroll_cap_is_rejected() {
        let mut config = valid();
        config.max_scroll_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: CollectorConfig =
            serde_json::from_str(r#"{"profile_id": "p1", "retention_days": 10}"#)
                .expect("parse");
        assert_eq!(config.profile_id(), "p1");
        assert_eq!(config.retention_days(), 10);
        assert_eq!(config.recent_days(), 3);
        assert_eq!(config.schedule_hours(), &[8, 16, 23]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = valid();
        config.apply_overrides_from(|key| match key {
            ENV_PROFILE_ID => Some("other".to_string()),
            ENV_BIND_ADDR => Some("0.0.0.0:8080".to_string()),
            _ => None,
        });
        assert_eq!(config.profile_id(), "other");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_path(), Path::new("test.db"));
    }
}
