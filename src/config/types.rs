//! Core configuration types for collection runs
//!
//! This module contains the main `CollectorConfig` struct and the data
//! source enumeration the orchestrator walks through on every run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::utils::constants::{
    DEFAULT_AUTH_TIMEOUT_SECS, DEFAULT_BIND_ADDR, DEFAULT_BROKER_URL, DEFAULT_DATABASE_PATH,
    DEFAULT_ELEMENT_TIMEOUT_SECS, DEFAULT_HEALTH_PATH, DEFAULT_HEALTH_TIMEOUT_SECS,
    DEFAULT_LOG_FILE, DEFAULT_MAX_SCROLL_ITERATIONS, DEFAULT_NAVIGATION_TIMEOUT_SECS,
    DEFAULT_RECENT_DAYS, DEFAULT_RETENTION_DAYS, DEFAULT_SCHEDULE_HOURS,
    DEFAULT_SCROLL_DELAY_SECS, DEFAULT_SETTLE_DELAY_SECS, DEFAULT_START_PATH,
    DEFAULT_START_TIMEOUT_SECS, DEFAULT_STOP_PATH, PLATFORM_ROOT_URL, PURCHASES_URL,
    SUBSCRIBERS_URL, TIPS_URL,
};

/// Main configuration struct for the collector process
///
/// Every field has a default so a JSON config file only needs to name what
/// it changes. The profile id has no meaningful default and is checked by
/// [`CollectorConfig::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Browser profile the broker should start
    pub(crate) profile_id: String,

    /// Broker API base URL, e.g. `http://localhost:50325`
    pub(crate) broker_url: String,
    pub(crate) health_path: String,
    pub(crate) start_path: String,
    pub(crate) stop_path: String,
    pub(crate) health_timeout_secs: u64,
    pub(crate) start_timeout_secs: u64,

    /// Ask the broker to stop the profile's browser when a session is released
    pub(crate) stop_browser_on_release: bool,

    pub(crate) platform_root_url: String,
    pub(crate) subscribers_url: String,
    pub(crate) purchases_url: String,
    pub(crate) tips_url: String,

    pub(crate) database_path: PathBuf,
    pub(crate) log_file: PathBuf,

    pub(crate) auth_timeout_secs: u64,
    pub(crate) navigation_timeout_secs: u64,
    pub(crate) settle_delay_secs: u64,
    pub(crate) element_timeout_secs: u64,
    pub(crate) scroll_delay_secs: u64,

    /// Upper bound on scroll-to-bottom iterations for one page
    ///
    /// Pages whose height keeps growing (or oscillates) would otherwise
    /// scroll forever.
    pub(crate) max_scroll_iterations: u32,

    /// Subscribers dated before `today - retention_days` are pruned at startup
    pub(crate) retention_days: u32,

    /// Dashboard shows subscribers dated on or after `today - recent_days`
    pub(crate) recent_days: u32,

    /// Local hours (0-23) at which scheduled runs fire
    pub(crate) schedule_hours: Vec<u32>,
    pub(crate) run_on_startup: bool,

    /// Dashboard listen address
    pub(crate) bind_addr: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            profile_id: String::new(),
            broker_url: DEFAULT_BROKER_URL.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            start_path: DEFAULT_START_PATH.to_string(),
            stop_path: DEFAULT_STOP_PATH.to_string(),
            health_timeout_secs: DEFAULT_HEALTH_TIMEOUT_SECS,
            start_timeout_secs: DEFAULT_START_TIMEOUT_SECS,
            stop_browser_on_release: true,
            platform_root_url: PLATFORM_ROOT_URL.to_string(),
            subscribers_url: SUBSCRIBERS_URL.to_string(),
            purchases_url: PURCHASES_URL.to_string(),
            tips_url: TIPS_URL.to_string(),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            settle_delay_secs: DEFAULT_SETTLE_DELAY_SECS,
            element_timeout_secs: DEFAULT_ELEMENT_TIMEOUT_SECS,
            scroll_delay_secs: DEFAULT_SCROLL_DELAY_SECS,
            max_scroll_iterations: DEFAULT_MAX_SCROLL_ITERATIONS,
            retention_days: DEFAULT_RETENTION_DAYS,
            recent_days: DEFAULT_RECENT_DAYS,
            schedule_hours: DEFAULT_SCHEDULE_HOURS.to_vec(),
            run_on_startup: true,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// Kind of money movement recorded in the transactions table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Tip,
}

impl TransactionKind {
    /// Value stored in the `type` column
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Tip => "tip",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionKind::Purchase),
            "tip" => Ok(TransactionKind::Tip),
            other => Err(format!("unknown transaction type '{other}'")),
        }
    }
}

/// One listing page collected per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Subscribers,
    Purchases,
    Tips,
}

impl DataSource {
    /// Collection order within a run
    pub const ALL: [DataSource; 3] = [
        DataSource::Subscribers,
        DataSource::Purchases,
        DataSource::Tips,
    ];

    /// Transaction kind for transaction sources, `None` for subscribers
    #[must_use]
    pub fn transaction_kind(self) -> Option<TransactionKind> {
        match self {
            DataSource::Subscribers => None,
            DataSource::Purchases => Some(TransactionKind::Purchase),
            DataSource::Tips => Some(TransactionKind::Tip),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Subscribers => "subscribers",
            DataSource::Purchases => "purchases",
            DataSource::Tips => "tips",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
