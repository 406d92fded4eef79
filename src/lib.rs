//! fanledger: collects subscriber and transaction notifications from a
//! creator dashboard into SQLite.
//!
//! A run attaches to a broker-provided, already signed-in browser, expands
//! three infinite-scroll listings, extracts records from the rendered HTML
//! and reconciles them into the store one committed pass per listing.

pub mod app;
pub mod broker;
pub mod collector;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod logging;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod utils;

pub use app::App;
pub use broker::{BrokerClient, BrokerReply, SessionEndpoints};
pub use collector::{Collector, PassReport, PassStatus, RunOutcome, RunPhase, RunReport};
pub use config::{CollectorConfig, DataSource, TransactionKind};
pub use error::{CollectorError, CollectorResult, ExtractError};
pub use extractor::{Amount, Extraction, RawSubscriber, RawTransaction, extract_subscribers, extract_transactions};
pub use loader::{LoadOptions, LoadedPage, ScrollOutcome};
pub use session::{BrowserSession, ChromeBroker, ChromeSession, SessionBroker, acquire_session};
pub use store::{CleanupStats, DashboardFilters, DashboardView, PassCounts, Store, UpsertOutcome};
