//! Error types for collection runs
//!
//! Errors are classified by how far they are allowed to travel: record-level
//! problems never leave the extractor, pass-level problems stop at the
//! orchestrator, and only session acquisition can end a run early.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for collector operations
pub type CollectorResult<T> = Result<T, CollectorError>;

/// Error types for broker, browser and store operations
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Broker health probe failed or the start request could not be sent
    #[error("Session broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// Broker answered with a non-zero status code
    #[error("Session broker rejected the request (code {code}): {message}")]
    BrokerRejected { code: i64, message: String },

    /// Browser never left the login/auth path after navigation
    #[error("Platform login required: still on an auth page after {0:?}")]
    AuthRequired(Duration),

    /// No record block appeared on a listing page in time
    #[error("Timed out after {timeout:?} waiting for records on {url}")]
    LoadTimeout { url: String, timeout: Duration },

    /// CDP / browser communication failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// Store failure; rolls back the current pass only
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A run was triggered while another one was still in progress
    #[error("A collection run is already in progress")]
    RunInProgress,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for CollectorError {
    fn from(error: anyhow::Error) -> Self {
        // {:#} keeps the context chain
        CollectorError::Other(format!("{error:#}"))
    }
}

impl From<chromiumoxide::error::CdpError> for CollectorError {
    fn from(error: chromiumoxide::error::CdpError) -> Self {
        CollectorError::Browser(error.to_string())
    }
}

impl CollectorError {
    /// Check if a later run could plausibly succeed without manual action
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CollectorError::BrokerUnavailable(_)
                | CollectorError::LoadTimeout { .. }
                | CollectorError::Browser(_)
                | CollectorError::RunInProgress
        )
    }

    /// Errors that need someone to fix the environment before the next run
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CollectorError::AuthRequired(_) | CollectorError::Config(_)
        )
    }

    /// Short stable name used in run reports and the dashboard
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            CollectorError::BrokerUnavailable(_) => "broker_unavailable",
            CollectorError::BrokerRejected { .. } => "broker_rejected",
            CollectorError::AuthRequired(_) => "auth_required",
            CollectorError::LoadTimeout { .. } => "load_timeout",
            CollectorError::Browser(_) => "browser",
            CollectorError::Store(_) => "store",
            CollectorError::RunInProgress => "run_in_progress",
            CollectorError::Config(_) => "config",
            CollectorError::Other(_) => "other",
        }
    }
}

/// Why a single record block was dropped during extraction
///
/// These never escape the extractor; they are counted and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("record has no profile link")]
    MissingProfileLink,

    #[error("username '{0}' is excluded")]
    ExcludedUsername(String),

    #[error("record has no display name")]
    MissingDisplayName,

    #[error("record has no amount field")]
    MissingAmount,

    #[error("record has no date field")]
    MissingDate,

    #[error("unparseable amount '{0}'")]
    InvalidAmount(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_required_is_fatal_not_transient() {
        let err = CollectorError::AuthRequired(Duration::from_secs(10));
        assert!(err.is_fatal());
        assert!(!err.is_transient());
        assert_eq!(err.kind(), "auth_required");
    }

    #[test]
    fn broker_unavailable_is_transient() {
        let err = CollectorError::BrokerUnavailable("connection refused".to_string());
        assert!(err.is_transient());
        assert!(!err.is_fatal());
    }

    #[test]
    fn anyhow_conversion_keeps_context() {
        let err = anyhow::anyhow!("inner").context("outer");
        let converted = CollectorError::from(err);
        assert_eq!(converted.to_string(), "outer: inner");
    }
}
