//! Reconciliation store backed by SQLite.
//!
//! Two independent tables:
//! - `subscribers`: one row per username, first sighting wins
//! - `transactions`: one row per (username, amount, type, date)
//!
//! Dedup is enforced by UNIQUE constraints and `INSERT OR IGNORE`, so
//! re-running a pass over the same page never adds rows. Subscribers are
//! pruned by age at startup; transactions are kept forever.

mod query;
mod writes;

pub use query::{DashboardFilters, DashboardView, SubscriberRow, TransactionRow};
pub use writes::{PassCounts, PassWriter, UpsertOutcome};

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use log::{debug, info};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::error::CollectorResult;
use crate::extractor::is_excluded_username;

/// Date format used in every date column
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQL schema for the store
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS subscribers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    subscribed_date TEXT NOT NULL,
    collected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_subscribers_date ON subscribers(subscribed_date);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
    type TEXT NOT NULL CHECK (type IN ('purchase', 'tip')),
    date TEXT NOT NULL,
    collected_at TEXT NOT NULL,
    UNIQUE(username, amount_cents, type, date)
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
"#;

/// Rows removed by the startup cleanup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub invalid_usernames: u64,
    pub expired: u64,
}

/// Handle to the persistent store.
///
/// Cheap to clone; clones share one connection pool. Writers use WAL mode
/// so dashboard reads never wait on a collection pass.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
}

impl Store {
    /// Open or create the database and ensure the schema exists.
    ///
    /// Does not prune; see [`Store::initialize`].
    pub async fn open(path: &Path) -> CollectorResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        // Idempotent - CREATE IF NOT EXISTS
        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        debug!("Opened store at {}", path.display());
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Open the store and run the startup cleanup against today's local date.
    pub async fn initialize(path: &Path, retention_days: u32) -> CollectorResult<Self> {
        Self::initialize_at(path, retention_days, Local::now().date_naive()).await
    }

    /// [`Store::initialize`] with an explicit "today"
    pub async fn initialize_at(
        path: &Path,
        retention_days: u32,
        today: NaiveDate,
    ) -> CollectorResult<Self> {
        let store = Self::open(path).await?;
        let stats = store.cleanup(today, retention_days).await?;
        info!(
            "Store ready at {} (removed {} invalid and {} expired subscribers)",
            path.display(),
            stats.invalid_usernames,
            stats.expired
        );
        Ok(store)
    }

    /// Remove subscriber rows that break the username rules or fall outside
    /// the retention window.
    ///
    /// A row dated exactly `retention_days` before `today` is kept. Safe to
    /// run any number of times.
    pub async fn cleanup(&self, today: NaiveDate, retention_days: u32) -> CollectorResult<CleanupStats> {
        let cutoff = retention_cutoff(today, retention_days);
        let mut tx = self.pool.begin().await?;

        let usernames: Vec<(String,)> = sqlx::query_as("SELECT username FROM subscribers")
            .fetch_all(&mut *tx)
            .await?;

        let mut stats = CleanupStats::default();
        for (username,) in usernames.into_iter().filter(|(u,)| is_excluded_username(u)) {
            let result = sqlx::query("DELETE FROM subscribers WHERE username = ?")
                .bind(&username)
                .execute(&mut *tx)
                .await?;
            debug!("Removed invalid subscriber '{username}'");
            stats.invalid_usernames += result.rows_affected();
        }

        let result = sqlx::query("DELETE FROM subscribers WHERE subscribed_date < ?")
            .bind(cutoff.format(DATE_FORMAT).to_string())
            .execute(&mut *tx)
            .await?;
        stats.expired = result.rows_affected();

        tx.commit().await?;
        Ok(stats)
    }

    /// Get total number of subscriber rows.
    pub async fn subscriber_count(&self) -> CollectorResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Get total number of transaction rows.
    pub async fn transaction_count(&self) -> CollectorResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Database file this store was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Oldest subscribed date that survives cleanup
#[must_use]
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN)
}
