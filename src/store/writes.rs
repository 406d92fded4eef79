//! Insert-if-absent writes and per-pass units of work

use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use sqlx::{Sqlite, SqliteConnection, Transaction};

use super::{DATE_FORMAT, Store};
use crate::error::CollectorResult;
use crate::extractor::RawTransaction;

/// Result of an insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyExists,
}

impl UpsertOutcome {
    fn from_rows(rows_affected: u64) -> Self {
        if rows_affected > 0 {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::AlreadyExists
        }
    }
}

async fn insert_subscriber(
    conn: &mut SqliteConnection,
    username: &str,
    subscribed_date: NaiveDate,
) -> Result<UpsertOutcome, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO subscribers (username, subscribed_date, collected_at) VALUES (?, ?, ?)",
    )
    .bind(username)
    .bind(subscribed_date.format(DATE_FORMAT).to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(UpsertOutcome::from_rows(result.rows_affected()))
}

async fn insert_transaction(
    conn: &mut SqliteConnection,
    record: &RawTransaction,
) -> Result<UpsertOutcome, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO transactions (username, amount_cents, type, date, collected_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.username)
    .bind(record.amount.cents())
    .bind(record.kind.as_str())
    .bind(record.date.format(DATE_FORMAT).to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(UpsertOutcome::from_rows(result.rows_affected()))
}

impl Store {
    /// Insert a subscriber unless the username is already known.
    ///
    /// An existing row is never updated, even when `subscribed_date` differs.
    pub async fn upsert_subscriber(
        &self,
        username: &str,
        subscribed_date: NaiveDate,
    ) -> CollectorResult<UpsertOutcome> {
        let mut conn = self.pool.acquire().await?;
        Ok(insert_subscriber(&mut conn, username, subscribed_date).await?)
    }

    /// Insert a transaction unless its composite key is already present.
    pub async fn upsert_transaction(&self, record: &RawTransaction) -> CollectorResult<UpsertOutcome> {
        let mut conn = self.pool.acquire().await?;
        Ok(insert_transaction(&mut conn, record).await?)
    }

    /// Start the unit of work for one collection pass.
    ///
    /// Nothing written through the returned writer is visible until
    /// [`PassWriter::commit`]; dropping it rolls back.
    pub async fn begin_pass(&self) -> CollectorResult<PassWriter> {
        let tx = self.pool.begin().await?;
        Ok(PassWriter {
            tx,
            inserted: 0,
            duplicates: 0,
        })
    }
}

/// Counts reported by a committed pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Writes of one collection pass, committed together
pub struct PassWriter {
    tx: Transaction<'static, Sqlite>,
    inserted: usize,
    duplicates: usize,
}

impl PassWriter {
    fn tally(&mut self, outcome: UpsertOutcome) -> UpsertOutcome {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::AlreadyExists => self.duplicates += 1,
        }
        outcome
    }

    pub async fn upsert_subscriber(
        &mut self,
        username: &str,
        subscribed_date: NaiveDate,
    ) -> CollectorResult<UpsertOutcome> {
        let outcome = insert_subscriber(&mut self.tx, username, subscribed_date).await?;
        if outcome == UpsertOutcome::Inserted {
            debug!("Added subscriber: {username}");
        }
        Ok(self.tally(outcome))
    }

    pub async fn upsert_transaction(&mut self, record: &RawTransaction) -> CollectorResult<UpsertOutcome> {
        let outcome = insert_transaction(&mut self.tx, record).await?;
        if outcome == UpsertOutcome::Inserted {
            debug!(
                "Added transaction: {} - {} - {}",
                record.username, record.amount, record.kind
            );
        }
        Ok(self.tally(outcome))
    }

    /// Commit every write of this pass
    pub async fn commit(self) -> CollectorResult<PassCounts> {
        let counts = PassCounts {
            inserted: self.inserted,
            duplicates: self.duplicates,
        };
        self.tx.commit().await?;
        Ok(counts)
    }

    /// Discard every write of this pass
    pub async fn rollback(self) {
        if let Err(e) = self.tx.rollback().await {
            warn!("Failed to roll back pass: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransactionKind;
    use crate::extractor::Amount;
    use tempfile::TempDir;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).expect("valid date")
    }

    #[tokio::test]
    async fn test_subscriber_first_sighting_wins() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = Store::open(&temp_dir.path().join("t.db")).await?;

        assert_eq!(
            store.upsert_subscriber("alice", day("2024-01-01")).await?,
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.upsert_subscriber("alice", day("2024-02-01")).await?,
            UpsertOutcome::AlreadyExists
        );

        let (date,): (String,) =
            sqlx::query_as("SELECT subscribed_date FROM subscribers WHERE username = 'alice'")
                .fetch_one(&store.pool)
                .await?;
        assert_eq!(date, "2024-01-01");

        store.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_pass_rolls_back() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = Store::open(&temp_dir.path().join("t.db")).await?;

        let mut committed = store.begin_pass().await?;
        committed.upsert_subscriber("kept_user", day("2024-01-01")).await?;
        let counts = committed.commit().await?;
        assert_eq!(counts.inserted, 1);

        let mut failed = store.begin_pass().await?;
        failed
            .upsert_transaction(&RawTransaction {
                username: "alice".to_string(),
                amount: Amount::from_cents(999),
                kind: TransactionKind::Tip,
                date: day("2024-01-01"),
            })
            .await?;
        failed.rollback().await;

        assert_eq!(store.subscriber_count().await?, 1);
        assert_eq!(store.transaction_count().await?, 0);

        store.close().await;
        Ok(())
    }
}
