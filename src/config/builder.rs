//! Type-safe builder for `CollectorConfig` using the typestate pattern
//!
//! `build()` only exists once the profile id and the database path have
//! been supplied, so a collector can never be configured without them.

use anyhow::Result;
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::CollectorConfig;

// Type states for the builder
pub struct WithProfile;
pub struct Complete;

pub struct CollectorConfigBuilder<State = ()> {
    pub(crate) draft: CollectorConfig,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for CollectorConfigBuilder<()> {
    fn default() -> Self {
        Self {
            draft: CollectorConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl CollectorConfig {
    /// Create a builder for configuring a `CollectorConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CollectorConfigBuilder<()> {
        CollectorConfigBuilder::default()
    }
}

impl CollectorConfigBuilder<()> {
    pub fn profile_id(mut self, id: impl Into<String>) -> CollectorConfigBuilder<WithProfile> {
        self.draft.profile_id = id.into().trim().to_string();
        CollectorConfigBuilder {
            draft: self.draft,
            _phantom: PhantomData,
        }
    }
}

impl CollectorConfigBuilder<WithProfile> {
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> CollectorConfigBuilder<Complete> {
        self.draft.database_path = path.into();
        CollectorConfigBuilder {
            draft: self.draft,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl CollectorConfigBuilder<Complete> {
    pub fn build(self) -> Result<CollectorConfig> {
        let config = self.draft;
        config.validate()?;
        Ok(config)
    }
}

// Optional settings, available in every state
impl<State> CollectorConfigBuilder<State> {
    #[must_use]
    pub fn broker_url(mut self, url: impl Into<String>) -> Self {
        self.draft.broker_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn broker_paths(
        mut self,
        health: impl Into<String>,
        start: impl Into<String>,
        stop: impl Into<String>,
    ) -> Self {
        self.draft.health_path = health.into();
        self.draft.start_path = start.into();
        self.draft.stop_path = stop.into();
        self
    }

    #[must_use]
    pub fn stop_browser_on_release(mut self, stop: bool) -> Self {
        self.draft.stop_browser_on_release = stop;
        self
    }

    #[must_use]
    pub fn platform_root_url(mut self, url: impl Into<String>) -> Self {
        self.draft.platform_root_url = url.into();
        self
    }

    #[must_use]
    pub fn source_urls(
        mut self,
        subscribers: impl Into<String>,
        purchases: impl Into<String>,
        tips: impl Into<String>,
    ) -> Self {
        self.draft.subscribers_url = subscribers.into();
        self.draft.purchases_url = purchases.into();
        self.draft.tips_url = tips.into();
        self
    }

    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.draft.log_file = path.into();
        self
    }

    #[must_use]
    pub fn auth_timeout_secs(mut self, secs: u64) -> Self {
        self.draft.auth_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn settle_delay_secs(mut self, secs: u64) -> Self {
        self.draft.settle_delay_secs = secs;
        self
    }

    #[must_use]
    pub fn element_timeout_secs(mut self, secs: u64) -> Self {
        self.draft.element_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn scroll_delay_secs(mut self, secs: u64) -> Self {
        self.draft.scroll_delay_secs = secs;
        self
    }

    #[must_use]
    pub fn max_scroll_iterations(mut self, max: u32) -> Self {
        self.draft.max_scroll_iterations = max;
        self
    }

    #[must_use]
    pub fn retention_days(mut self, days: u32) -> Self {
        self.draft.retention_days = days;
        self
    }

    #[must_use]
    pub fn recent_days(mut self, days: u32) -> Self {
        self.draft.recent_days = days;
        self
    }

    #[must_use]
    pub fn schedule_hours(mut self, hours: impl Into<Vec<u32>>) -> Self {
        self.draft.schedule_hours = hours.into();
        self
    }

    #[must_use]
    pub fn run_on_startup(mut self, run: bool) -> Self {
        self.draft.run_on_startup = run;
        self
    }

    #[must_use]
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.draft.bind_addr = addr.into();
        self
    }
}
