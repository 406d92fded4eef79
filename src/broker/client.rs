//! HTTP client for the browser-profile broker
//!
//! The broker is an opaque local service: it starts an already logged-in
//! browser for a profile and returns DevTools connection parameters.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use super::types::{BrokerReply, SessionEndpoints};
use crate::config::CollectorConfig;
use crate::error::{CollectorError, CollectorResult};

/// Thin wrapper over the broker's HTTP API
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: Client,
    health_url: String,
    start_url: String,
    stop_url: String,
    health_timeout: Duration,
    start_timeout: Duration,
}

impl BrokerClient {
    pub fn new(config: &CollectorConfig) -> CollectorResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| CollectorError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            health_url: config.health_url(),
            start_url: config.start_url(),
            stop_url: config.stop_url(),
            health_timeout: config.health_timeout(),
            start_timeout: config.start_timeout(),
        })
    }

    /// Lightweight reachability probe with a short timeout
    ///
    /// Fails fast with `BrokerUnavailable`; retrying is the caller's call.
    pub async fn check_health(&self) -> CollectorResult<()> {
        let response = self
            .http
            .get(&self.health_url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| CollectorError::BrokerUnavailable(format!("{}: {e}", self.health_url)))?;

        if !response.status().is_success() {
            return Err(CollectorError::BrokerUnavailable(format!(
                "{} answered HTTP {}",
                self.health_url,
                response.status()
            )));
        }

        debug!("Broker health probe ok: {}", self.health_url);
        Ok(())
    }

    /// Ask the broker to start (or reuse) the browser of `profile_id`
    pub async fn start_browser(&self, profile_id: &str) -> CollectorResult<SessionEndpoints> {
        info!("Requesting browser session for profile {profile_id}");

        let response = self
            .http
            .get(&self.start_url)
            .query(&[("user_id", profile_id)])
            .timeout(self.start_timeout)
            .send()
            .await
            .map_err(|e| CollectorError::BrokerUnavailable(format!("{}: {e}", self.start_url)))?;

        let body = response
            .text()
            .await
            .map_err(|e| CollectorError::BrokerUnavailable(format!("reading broker reply: {e}")))?;

        match BrokerReply::from_json(&body)? {
            BrokerReply::Started(endpoints) => {
                info!(
                    "Broker started profile {profile_id}, DevTools at {}",
                    endpoints.debugger_address
                );
                Ok(endpoints)
            }
            BrokerReply::Rejected { code, message } => {
                warn!("Broker rejected profile {profile_id}: code {code}, {message}");
                Err(CollectorError::BrokerRejected { code, message })
            }
        }
    }

    /// Ask the broker to close the browser of `profile_id`
    ///
    /// Best-effort; failures are logged and swallowed.
    pub async fn stop_browser(&self, profile_id: &str) {
        let result = self
            .http
            .get(&self.stop_url)
            .query(&[("user_id", profile_id)])
            .timeout(self.start_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Broker stopped profile {profile_id}");
            }
            Ok(response) => {
                warn!("Broker stop for {profile_id} answered HTTP {}", response.status());
            }
            Err(e) => warn!("Failed to stop browser for {profile_id}: {e}"),
        }
    }
}
