//! Chrome sessions attached over the DevTools protocol
//!
//! The broker starts an already signed-in browser; we only connect to it,
//! open one tab and drive that tab. The browser process belongs to the
//! broker, so release never sends `Browser.close`.

use std::time::{Duration, Instant};

use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::page_helpers::{get_page_url_with_fallback, is_past_auth};
use super::{BrowserSession, SessionBroker};
use crate::broker::{BrokerClient, SessionEndpoints};
use crate::config::CollectorConfig;
use crate::error::{CollectorError, CollectorResult};
use crate::loader::page_timeout::with_page_timeout;
use crate::loader::{self, LoadOptions, LoadedPage};

/// Poll interval while waiting to leave the login path
const AUTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Connected browser plus the tab this crate opened in it
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    profile_id: String,
    /// Set when the broker should stop the browser on release
    stop_hook: Option<BrokerClient>,
    navigation_timeout_secs: u64,
}

impl ChromeSession {
    /// Attach to the browser described by `endpoints`
    ///
    /// The CDP handler runs on its own task; its `JoinHandle` is kept so
    /// release can abort it.
    pub async fn connect(
        endpoints: &SessionEndpoints,
        profile_id: &str,
        stop_hook: Option<BrokerClient>,
        navigation_timeout_secs: u64,
    ) -> CollectorResult<Self> {
        let cdp_url = endpoints.cdp_url();
        info!("Attaching to browser at {cdp_url}");

        let (browser, mut handler) = with_page_timeout(
            Browser::connect(cdp_url.clone()),
            navigation_timeout_secs,
            "DevTools connect",
        )
        .await?;

        let handler_task = task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!("Browser handler error: {:?}", e);
                }
            }
            debug!("Browser event handler task completed");
        });

        let mut session = Self {
            browser,
            handler: handler_task,
            page: None,
            profile_id: profile_id.to_string(),
            stop_hook,
            navigation_timeout_secs,
        };

        // A fresh tab keeps us off whatever the profile had open
        let opened = session.browser.new_page("about:blank").await;
        match opened {
            Ok(page) => {
                session.page = Some(page);
                Ok(session)
            }
            Err(e) => {
                // Dropping aborts the handler; the broker stop is left to the caller
                drop(session);
                Err(CollectorError::Browser(format!("Failed to open a tab on {cdp_url}: {e}")))
            }
        }
    }

    fn page(&self) -> CollectorResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| CollectorError::Browser("session has no open page".to_string()))
    }

    #[must_use]
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }
}

impl BrowserSession for ChromeSession {
    async fn verify_authenticated(&mut self, root_url: &str, timeout: Duration) -> CollectorResult<()> {
        let page = self.page()?;
        with_page_timeout(page.goto(root_url), self.navigation_timeout_secs, "Root navigation").await?;

        let start = Instant::now();
        loop {
            let current = get_page_url_with_fallback(page).await;
            if is_past_auth(&current) {
                debug!("Signed in, landed on {current} after {:?}", start.elapsed());
                return Ok(());
            }
            if start.elapsed() >= timeout {
                warn!("Still on {current} after {timeout:?}; profile {} needs a manual login", self.profile_id);
                return Err(CollectorError::AuthRequired(timeout));
            }
            tokio::time::sleep(AUTH_POLL_INTERVAL).await;
        }
    }

    async fn load_and_expand(&mut self, url: &str, options: &LoadOptions) -> CollectorResult<LoadedPage> {
        let page = self.page()?;
        loader::load_and_expand(page, url, options).await
    }

    async fn release(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!("Failed to close collector tab: {e}");
            }
        }

        self.handler.abort();

        if let Some(broker) = self.stop_hook.take() {
            broker.stop_browser(&self.profile_id).await;
        }
        info!("Released browser session for profile {}", self.profile_id);
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // No-op after release(); aborting a finished task is harmless
        self.handler.abort();
    }
}

/// Broker-backed source of [`ChromeSession`]s
#[derive(Debug, Clone)]
pub struct ChromeBroker {
    client: BrokerClient,
    stop_on_release: bool,
    navigation_timeout_secs: u64,
}

impl ChromeBroker {
    pub fn new(config: &CollectorConfig) -> CollectorResult<Self> {
        Ok(Self {
            client: BrokerClient::new(config)?,
            stop_on_release: config.stop_browser_on_release(),
            navigation_timeout_secs: config.navigation_timeout_secs(),
        })
    }

    #[must_use]
    pub fn client(&self) -> &BrokerClient {
        &self.client
    }
}

impl SessionBroker for ChromeBroker {
    type Session = ChromeSession;

    async fn open_session(&self, profile_id: &str) -> CollectorResult<ChromeSession> {
        self.client.check_health().await?;
        let endpoints = self.client.start_browser(profile_id).await?;

        let stop_hook = self.stop_on_release.then(|| self.client.clone());
        match ChromeSession::connect(&endpoints, profile_id, stop_hook, self.navigation_timeout_secs).await {
            Ok(session) => Ok(session),
            Err(e) => {
                if self.stop_on_release {
                    self.client.stop_browser(profile_id).await;
                }
                Err(e)
            }
        }
    }
}
