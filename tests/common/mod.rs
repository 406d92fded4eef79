//! Test utilities for the fanledger test suite
//!
//! Fixture HTML builders shaped like the platform's notification listings,
//! a temp-dir store, and in-process fakes for the broker and browser.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fanledger::{
    BrowserSession, CollectorConfig, CollectorError, CollectorResult, DataSource, LoadOptions,
    LoadedPage, ScrollOutcome, SessionBroker, Store,
};
use parking_lot::Mutex;
use tempfile::TempDir;

// =============================================================================
// HTML fixtures
// =============================================================================

/// Wrap record blocks in a listing page
#[allow(dead_code)]
pub fn listing_page(blocks: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Notifications</title></head>
<body>
  <div class="notifications-list">
    {}
  </div>
</body>
</html>"#,
        blocks.join("\n    ")
    )
}

/// A subscriber notification block
#[allow(dead_code)]
pub fn subscriber_block(username: &str, display_name: &str) -> String {
    format!(
        r#"<div class="table-item">
      <a class="avatar" href="/profile/{username}"><img src="/a.png"></a>
      <div class="user-info"><span class="name">{display_name}</span></div>
      <div class="text">subscribed to you</div>
    </div>"#
    )
}

/// A record block without a profile link, e.g. a section header
#[allow(dead_code)]
pub fn header_block(text: &str) -> String {
    format!(r#"<div class="table-item"><div class="group-title">{text}</div></div>"#)
}

/// A purchase or tip notification block
#[allow(dead_code)]
pub fn transaction_block(username: &str, amount: &str, date: &str) -> String {
    format!(
        r#"<div class="table-item">
      <a href="/profile/{username}">{username}</a>
      <div class="amount">{amount}</div>
      <div class="date">{date}</div>
    </div>"#
    )
}

// =============================================================================
// Store and config
// =============================================================================

/// Store on a fresh database in a temp dir; keep the `TempDir` alive
#[allow(dead_code)]
pub async fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().expect("temp dir");
    let store = Store::open(&dir.path().join("test.db")).await.expect("open store");
    (dir, store)
}

#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> CollectorConfig {
    CollectorConfig::builder()
        .profile_id("test-profile")
        .database_path(dir.path().join("test.db"))
        .log_file(dir.path().join("collector.log"))
        .auth_timeout_secs(1)
        .build()
        .expect("valid config")
}

/// Load options with every delay at zero
#[allow(dead_code)]
pub fn instant_load_options(config: &CollectorConfig) -> LoadOptions {
    LoadOptions {
        settle_delay: Duration::ZERO,
        scroll_delay: Duration::ZERO,
        element_timeout: Duration::from_millis(10),
        ..LoadOptions::from_config(config)
    }
}

// =============================================================================
// Fake broker and session
// =============================================================================

/// What a fake page load returns
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum FakePage {
    Html(String),
    Timeout,
    BrowserFailure(String),
}

/// Why a fake broker refuses to open a session
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub enum OpenFailure {
    Unavailable,
    Rejected,
}

/// Shared counters the test inspects after a run
#[derive(Debug, Clone, Default)]
pub struct FakeTelemetry {
    pub opened: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub loads: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl FakeTelemetry {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().clone()
    }
}

#[derive(Debug, Clone)]
pub struct FakeBroker {
    pub signed_in: bool,
    pub open_failure: Option<OpenFailure>,
    pub pages: HashMap<String, FakePage>,
    pub load_delay: Duration,
    pub telemetry: FakeTelemetry,
}

#[allow(dead_code)]
impl FakeBroker {
    /// Signed-in broker whose pages all time out until set
    pub fn signed_in() -> Self {
        Self {
            signed_in: true,
            open_failure: None,
            pages: HashMap::new(),
            load_delay: Duration::ZERO,
            telemetry: FakeTelemetry::default(),
        }
    }

    pub fn with_page(mut self, config: &CollectorConfig, source: DataSource, page: FakePage) -> Self {
        self.pages.insert(config.source_url(source).to_string(), page);
        self
    }
}

pub struct FakeSession {
    signed_in: bool,
    pages: HashMap<String, FakePage>,
    load_delay: Duration,
    telemetry: FakeTelemetry,
}

impl SessionBroker for FakeBroker {
    type Session = FakeSession;

    async fn open_session(&self, _profile_id: &str) -> CollectorResult<FakeSession> {
        match self.open_failure {
            Some(OpenFailure::Unavailable) => {
                return Err(CollectorError::BrokerUnavailable("connection refused".to_string()));
            }
            Some(OpenFailure::Rejected) => {
                return Err(CollectorError::BrokerRejected {
                    code: -1,
                    message: "profile does not exist".to_string(),
                });
            }
            None => {}
        }
        self.telemetry.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            signed_in: self.signed_in,
            pages: self.pages.clone(),
            load_delay: self.load_delay,
            telemetry: self.telemetry.clone(),
        })
    }
}

impl BrowserSession for FakeSession {
    async fn verify_authenticated(&mut self, _root_url: &str, timeout: Duration) -> CollectorResult<()> {
        if self.signed_in {
            Ok(())
        } else {
            Err(CollectorError::AuthRequired(timeout))
        }
    }

    async fn load_and_expand(&mut self, url: &str, options: &LoadOptions) -> CollectorResult<LoadedPage> {
        self.telemetry.loads.lock().push(url.to_string());
        tokio::time::sleep(self.load_delay).await;

        match self.pages.get(url).cloned().unwrap_or(FakePage::Timeout) {
            FakePage::Html(html) => Ok(LoadedPage {
                url: url.to_string(),
                html,
                scroll: ScrollOutcome {
                    iterations: 1,
                    final_height: 1000,
                    capped: false,
                },
            }),
            FakePage::Timeout => Err(CollectorError::LoadTimeout {
                url: url.to_string(),
                timeout: options.element_timeout,
            }),
            FakePage::BrowserFailure(message) => Err(CollectorError::Browser(message)),
        }
    }

    async fn release(self) {
        self.telemetry.released.fetch_add(1, Ordering::SeqCst);
    }
}
