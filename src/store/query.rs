//! Read-only dashboard queries

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use super::{DATE_FORMAT, Store};
use crate::config::TransactionKind;
use crate::error::CollectorResult;
use crate::extractor::Amount;

/// Optional predicates for the transactions table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilters {
    /// Case-insensitive substring of the username
    pub username: Option<String>,
    pub kind: Option<TransactionKind>,
    /// Exact transaction date
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberRow {
    pub username: String,
    pub subscribed_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRow {
    pub username: String,
    pub kind: String,
    pub amount: Amount,
    pub date: String,
}

/// Everything the dashboard page shows
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub recent_subscribers: Vec<SubscriberRow>,
    pub transactions: Vec<TransactionRow>,
}

fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Store {
    /// Subscribers dated on or after `today - recent_days`, newest first
    pub async fn recent_subscribers(
        &self,
        today: NaiveDate,
        recent_days: u32,
    ) -> CollectorResult<Vec<SubscriberRow>> {
        let since = today
            .checked_sub_days(Days::new(u64::from(recent_days)))
            .unwrap_or(NaiveDate::MIN);

        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT username, subscribed_date
            FROM subscribers
            WHERE subscribed_date >= ?
            ORDER BY subscribed_date DESC, id DESC
            "#,
        )
        .bind(since.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(username, subscribed_date)| SubscriberRow {
                username,
                subscribed_date,
            })
            .collect())
    }

    /// Transactions matching every set filter, newest first
    pub async fn filtered_transactions(
        &self,
        filters: &DashboardFilters,
    ) -> CollectorResult<Vec<TransactionRow>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT username, type, amount_cents, date FROM transactions WHERE 1=1",
        );

        if let Some(username) = filters
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
        {
            qb.push(" AND username LIKE ")
                .push_bind(format!("%{}%", escape_like(username)))
                .push(" ESCAPE '\\'");
        }
        if let Some(kind) = filters.kind {
            qb.push(" AND type = ").push_bind(kind.as_str());
        }
        if let Some(date) = filters.date {
            qb.push(" AND date = ")
                .push_bind(date.format(DATE_FORMAT).to_string());
        }
        qb.push(" ORDER BY date DESC, id DESC");

        let rows: Vec<(String, String, i64, String)> =
            qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(username, kind, cents, date)| TransactionRow {
                username,
                kind,
                amount: Amount::from_cents(cents),
                date,
            })
            .collect())
    }

    /// Both dashboard tables in one call
    pub async fn query_dashboard(
        &self,
        filters: &DashboardFilters,
        today: NaiveDate,
        recent_days: u32,
    ) -> CollectorResult<DashboardView> {
        Ok(DashboardView {
            recent_subscribers: self.recent_subscribers(today, recent_days).await?,
            transactions: self.filtered_transactions(filters).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("a_b%c"), "a\\_b\\%c");
        assert_eq!(escape_like("plain"), "plain");
    }
}
