//! Getter methods for `CollectorConfig`

use std::path::Path;
use std::time::Duration;

use super::types::{CollectorConfig, DataSource};

impl CollectorConfig {
    #[must_use]
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    #[must_use]
    pub fn broker_url(&self) -> &str {
        &self.broker_url
    }

    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}{}", self.broker_url, self.health_path)
    }

    #[must_use]
    pub fn start_url(&self) -> String {
        format!("{}{}", self.broker_url, self.start_path)
    }

    #[must_use]
    pub fn stop_url(&self) -> String {
        format!("{}{}", self.broker_url, self.stop_path)
    }

    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    #[must_use]
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    #[must_use]
    pub fn stop_browser_on_release(&self) -> bool {
        self.stop_browser_on_release
    }

    #[must_use]
    pub fn platform_root_url(&self) -> &str {
        &self.platform_root_url
    }

    /// Listing page for a data source
    #[must_use]
    pub fn source_url(&self, source: DataSource) -> &str {
        match source {
            DataSource::Subscribers => &self.subscribers_url,
            DataSource::Purchases => &self.purchases_url,
            DataSource::Tips => &self.tips_url,
        }
    }

    #[must_use]
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    #[must_use]
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    #[must_use]
    pub fn navigation_timeout_secs(&self) -> u64 {
        self.navigation_timeout_secs
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    #[must_use]
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    #[must_use]
    pub fn scroll_delay(&self) -> Duration {
        Duration::from_secs(self.scroll_delay_secs)
    }

    #[must_use]
    pub fn max_scroll_iterations(&self) -> u32 {
        self.max_scroll_iterations
    }

    #[must_use]
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    #[must_use]
    pub fn recent_days(&self) -> u32 {
        self.recent_days
    }

    #[must_use]
    pub fn schedule_hours(&self) -> &[u32] {
        &self.schedule_hours
    }

    #[must_use]
    pub fn run_on_startup(&self) -> bool {
        self.run_on_startup
    }

    #[must_use]
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
}
