// SQLite Driver Implementation (set store)

use async_trait::async_trait;
use simpleq_core::domain::{keys, Stat, Stats};
use simpleq_core::error::{QueueError, Result};
use simpleq_core::port::Driver;
use sqlx::SqlitePool;
use tracing::debug;

// Helper to convert sqlx::Error to QueueError with structured information
fn map_sqlx_error(err: sqlx::Error) -> QueueError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) if code.as_ref() == "5" || code.as_ref() == "517" => QueueError::Driver(
                format!("Database locked (SQLITE_BUSY): {}", db_err.message()),
            ),
            Some(code) if code.as_ref() == "13" => {
                QueueError::Driver(format!("Database full: {}", db_err.message()))
            }
            Some(code) => QueueError::Driver(format!(
                "Database error [{}]: {}",
                code.as_ref(),
                db_err.message()
            )),
            None => QueueError::Driver(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::PoolTimedOut => QueueError::Driver("Connection pool timed out".to_string()),
        _ => QueueError::Driver(err.to_string()),
    }
}

/// Driver storing sets and counters in SQLite
///
/// Every primitive is a single statement, so each is atomic on its own.
/// Concurrent pops from several connections are serialized by SQLite's
/// writer lock; a pop losing that race reports a driver error and the
/// member stays in the set.
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// SADD
    async fn add_member(&self, key: &str, member: &[u8]) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO set_members (key, member) VALUES (?, ?)")
            .bind(key)
            .bind(member)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// SPOP
    async fn pop_member(&self, key: &str) -> Result<Option<Vec<u8>>> {
        sqlx::query_scalar::<_, Vec<u8>>(
            r#"
            DELETE FROM set_members
            WHERE rowid = (
                SELECT rowid FROM set_members
                WHERE key = ?
                ORDER BY RANDOM()
                LIMIT 1
            )
            RETURNING member
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    /// SMEMBERS
    async fn members(&self, key: &str) -> Result<Vec<String>> {
        let rows: Vec<Vec<u8>> =
            sqlx::query_scalar("SELECT member FROM set_members WHERE key = ? ORDER BY rowid")
                .bind(key)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|raw| String::from_utf8_lossy(&raw).into_owned())
            .collect())
    }

    /// INCR
    ///
    /// A stored value that is not an integer is left untouched and reported
    /// as an error.
    async fn increment(&self, key: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO counters (key, value) VALUES (?, '1')
            ON CONFLICT(key) DO UPDATE SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT)
            WHERE CAST(CAST(value AS INTEGER) AS TEXT) = value
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(QueueError::Driver(format!(
                "value at {} is not an integer",
                key
            )));
        }
        Ok(())
    }

    /// GET
    async fn counter(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM counters WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn write(&self, active_key: &str, data: &[u8]) -> Result<()> {
        self.add_member(active_key, data).await
    }

    async fn read(&self, active_key: &str) -> Result<Option<Vec<u8>>> {
        self.pop_member(active_key).await
    }

    async fn set_processed(&self, stats_key: &str) -> Result<()> {
        self.increment(&keys::processed_key(stats_key)).await
    }

    async fn set_failed(&self, stats_key: &str, message_id: &str) -> Result<()> {
        self.add_member(&keys::failed_key(stats_key), message_id.as_bytes())
            .await
    }

    async fn register(&self, queue: &str) -> Result<()> {
        self.add_member(&keys::registry_key(), queue.as_bytes()).await
    }

    async fn get_stats(&self) -> Result<Stats> {
        let queues = self.members(&keys::registry_key()).await?;
        debug!(queues = queues.len(), "Collecting queue stats");

        let mut stats = Stats::new();
        for queue in queues {
            let base = keys::stats_key(&queue);
            let processed = self.counter(&keys::processed_key(&base)).await?;
            let failed_ids = self.members(&keys::failed_key(&base)).await?;

            stats.insert(queue, Stat::from_raw(processed.as_deref(), failed_ids));
        }

        Ok(stats)
    }
}
