use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tracing::info;

/// SQLite store backing the dedup and archive tables
///
/// The short-lived table is the single source of truth for "already notified
/// today"; rows past their expiry are treated as absent. The long-lived
/// archive table is append-once price history and is never consulted for
/// dedup decisions.
pub struct StockStore {
    pool: Pool<Sqlite>,
    stocks_table: String,
    archive_table: String,
}

impl StockStore {
    /// Create a new stock store and initialize both tables
    pub async fn new(database_url: &str, stocks_table: &str, archive_table: &str) -> Result<Self> {
        validate_table_name(stocks_table)?;
        validate_table_name(archive_table)?;

        // Create data directory if needed
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .context("Failed to create database directory")?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(true);

        // SQLite serializes writers regardless; a single connection also
        // keeps every query on the same database when the URL is :memory:
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self {
            pool,
            stocks_table: stocks_table.to_string(),
            archive_table: archive_table.to_string(),
        };
        store.init_schema().await?;

        info!("Stock store initialized");
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                symbol TEXT PRIMARY KEY,
                gain_percent REAL NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            self.stocks_table
        ))
        .execute(&self.pool)
        .await
        .context("Failed to create stocks table")?;

        sqlx::query(&format!(
            r#"
            CREATE INDEX IF NOT EXISTS idx_{}_expires
            ON {} (expires_at)
            "#,
            self.stocks_table, self.stocks_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                symbol TEXT PRIMARY KEY,
                price REAL NOT NULL,
                recorded_at INTEGER NOT NULL
            )
            "#,
            self.archive_table
        ))
        .execute(&self.pool)
        .await
        .context("Failed to create archive table")?;

        Ok(())
    }

    /// Determine whether a live dedup record exists for the symbol
    ///
    /// A store error propagates rather than reading as "does not exist", so a
    /// transient fault cannot produce a duplicate notification.
    pub async fn exists(&self, symbol: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT 1 FROM {} WHERE symbol = ? AND expires_at > ?",
            self.stocks_table
        ))
        .bind(symbol)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up dedup record")?;

        Ok(row.is_some())
    }

    /// Record the symbol as notified and archive its first-seen price
    ///
    /// The dedup write overwrites any stale row for the symbol; the archive
    /// write is an idempotent no-op once a price has been recorded.
    pub async fn insert(&self, symbol: &str, gain_percent: f64, price: f64) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (symbol, gain_percent, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(symbol) DO UPDATE SET
                gain_percent = excluded.gain_percent,
                expires_at = excluded.expires_at
            "#,
            self.stocks_table
        ))
        .bind(symbol)
        .bind(gain_percent)
        .bind(compute_expiry(Utc::now()))
        .execute(&self.pool)
        .await
        .context("Failed to insert dedup record")?;

        self.insert_archive(symbol, price).await
    }

    /// Archive the symbol's price, write-once per symbol
    pub async fn insert_archive(&self, symbol: &str, price: f64) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (symbol, price, recorded_at)
            VALUES (?, ?, ?)
            ON CONFLICT(symbol) DO NOTHING
            "#,
            self.archive_table
        ))
        .bind(symbol)
        .bind(price)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to insert archive record")?;

        Ok(())
    }
}

/// Epoch seconds of 02:00:00 UTC on the calendar day after `t`
///
/// A fixed wall-clock cutover rather than "24 hours from now", so every
/// record created during one trading day expires together the following
/// morning.
pub fn compute_expiry(t: DateTime<Utc>) -> i64 {
    (t.date_naive() + Days::new(1))
        .and_hms_opt(2, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp()
}

/// Table names are interpolated into SQL, so restrict them to identifier
/// characters
fn validate_table_name(name: &str) -> Result<()> {
    anyhow::ensure!(!name.is_empty(), "table name cannot be empty");
    anyhow::ensure!(
        name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        "table name {:?} contains invalid characters",
        name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_store() -> StockStore {
        StockStore::new("sqlite::memory:", "stocks", "stocks_archive")
            .await
            .unwrap()
    }

    #[test]
    fn expiry_is_two_am_next_day() {
        let just_before_midnight = Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 59).unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 3, 15, 2, 0, 0).unwrap();
        assert_eq!(
            compute_expiry(just_before_midnight),
            expected.timestamp()
        );

        let just_after_midnight = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 1).unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 3, 16, 2, 0, 0).unwrap();
        assert_eq!(compute_expiry(just_after_midnight), expected.timestamp());
    }

    #[test]
    fn expiry_is_strictly_in_the_future() {
        let now = Utc::now();
        assert!(compute_expiry(now) > now.timestamp());
    }

    #[test]
    fn rejects_malformed_table_names() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("stocks; DROP TABLE stocks").is_err());
        assert!(validate_table_name("stocks_archive").is_ok());
    }

    #[tokio::test]
    async fn exists_reflects_inserted_symbols() {
        let store = test_store().await;

        assert!(!store.exists("GME").await.unwrap());

        store.insert("GME", 52.3, 123.45).await.unwrap();

        assert!(store.exists("GME").await.unwrap());
        assert!(!store.exists("AMC").await.unwrap());
    }

    #[tokio::test]
    async fn exists_ignores_expired_records() {
        let store = test_store().await;

        sqlx::query("INSERT INTO stocks (symbol, gain_percent, expires_at) VALUES (?, ?, ?)")
            .bind("GME")
            .bind(52.3)
            .bind(Utc::now().timestamp() - 60)
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(!store.exists("GME").await.unwrap());
    }

    #[tokio::test]
    async fn archive_insert_is_idempotent() {
        let store = test_store().await;

        store.insert_archive("GME", 123.45).await.unwrap();
        store.insert_archive("GME", 999.99).await.unwrap();

        let (price,): (f64,) = sqlx::query_as("SELECT price FROM stocks_archive WHERE symbol = ?")
            .bind("GME")
            .fetch_one(&store.pool)
            .await
            .unwrap();

        // First-recorded price wins
        assert_eq!(price, 123.45);
    }

    #[tokio::test]
    async fn insert_writes_both_tables() {
        let store = test_store().await;

        store.insert("GME", 52.3, 123.45).await.unwrap();

        assert!(store.exists("GME").await.unwrap());

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stocks_archive WHERE symbol = ?")
                .bind("GME")
                .fetch_one(&store.pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }
}
