//! SQLite-backed [`LogStore`].

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::storage::anonymize::anonymize_patient_id;
use crate::storage::model::{
    HealthLogEntry, LogFilters, LogPage, LogStats, NewHealthLog, Pagination, Severity, StatType,
};
use crate::storage::{LogStore, StorageError, StorageResult};

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Health log repository over a sqlx connection pool.
#[derive(Clone)]
pub struct SqliteLogStore {
    pool: SqlitePool,
}

impl SqliteLogStore {
    /// Open (creating if missing) the database described by `config` and
    /// make sure the schema exists.
    pub async fn connect(config: &StorageConfig) -> StorageResult<Self> {
        let in_memory = is_in_memory(&config.database_url);
        let mut options =
            SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);

        // Every connection to `:memory:` is a separate database, so keep
        // exactly one alive for the lifetime of the pool.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        info!(
            database_url = %config.database_url,
            in_memory,
            "Opening health log database"
        );

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect(&StorageConfig {
            database_url: IN_MEMORY_URL.to_string(),
            ..StorageConfig::default()
        })
        .await
    }

    /// Wrap an existing pool, creating the schema if needed.
    pub async fn from_pool(pool: SqlitePool) -> StorageResult<Self> {
        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

async fn init_schema(pool: &SqlitePool) -> StorageResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS health_logs (
            id TEXT PRIMARY KEY NOT NULL,
            timestamp TEXT NOT NULL,
            source TEXT NOT NULL,
            severity TEXT NOT NULL DEFAULT 'info'
                CHECK (severity IN ('error', 'warning', 'info')),
            message TEXT NOT NULL,
            patient_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_health_logs_severity ON health_logs(severity)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_health_logs_source ON health_logs(source)")
        .execute(pool)
        .await?;

    debug!("health_logs schema ready");
    Ok(())
}

/// Fixed-width UTC form, e.g. `2025-03-01T14:25:43.000Z`.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            column: "timestamp",
            message: format!("{raw}: {e}"),
        })
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &LogFilters) {
    let mut sep = " WHERE ";
    if let Some(severity) = filters.severity {
        qb.push(sep).push("severity = ").push_bind(severity.as_str());
        sep = " AND ";
    }
    if let Some(after) = filters.after {
        qb.push(sep)
            .push("timestamp >= ")
            .push_bind(format_timestamp(&after));
    }
}

fn row_to_entry(row: &SqliteRow) -> StorageResult<HealthLogEntry> {
    let timestamp: String = row.try_get("timestamp")?;
    let severity: String = row.try_get("severity")?;

    Ok(HealthLogEntry {
        id: row.try_get("id")?,
        timestamp: parse_timestamp(&timestamp)?,
        source: row.try_get("source")?,
        severity: severity
            .parse::<Severity>()
            .map_err(|e| StorageError::Corrupt {
                column: "severity",
                message: e.to_string(),
            })?,
        message: row.try_get("message")?,
        patient_id: None,
    })
}

fn to_count(raw: i64, column: &'static str) -> StorageResult<u64> {
    u64::try_from(raw).map_err(|e| StorageError::Corrupt {
        column,
        message: e.to_string(),
    })
}

#[async_trait]
impl LogStore for SqliteLogStore {
    async fn save(&self, entries: &[NewHealthLog]) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO health_logs (id, timestamp, source, severity, message, patient_id)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(format_timestamp(&entry.timestamp))
            .bind(entry.source.as_str())
            .bind(entry.severity.unwrap_or_default().as_str())
            .bind(entry.message.as_str())
            .bind(anonymize_patient_id(entry.patient_id.as_deref()))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = entries.len(), "Inserted health log rows");
        Ok(())
    }

    async fn find_and_count(
        &self,
        filters: &LogFilters,
        pagination: Pagination,
    ) -> StorageResult<LogPage> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM health_logs");
        push_filters(&mut count_query, filters);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT id, timestamp, source, severity, message FROM health_logs",
        );
        push_filters(&mut select, filters);
        select
            .push(" ORDER BY timestamp ASC, id ASC LIMIT ")
            .push_bind(i64::from(pagination.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(pagination.offset));

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_entry)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(LogPage {
            rows,
            count: to_count(total, "count")?,
        })
    }

    async fn stats_by_type(&self, stat: StatType) -> StorageResult<LogStats> {
        let column = stat.column();
        let sql = format!(
            "SELECT {column} AS value, COUNT(id) AS count FROM health_logs GROUP BY {column}"
        );

        let mut stats = LogStats::new();
        for row in sqlx::query(&sql).fetch_all(&self.pool).await? {
            let value: String = row.try_get("value")?;
            let count: i64 = row.try_get("count")?;
            stats.insert(value, to_count(count, "count")?);
        }
        Ok(stats)
    }

    async fn count(&self) -> StorageResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM health_logs")
            .fetch_one(&self.pool)
            .await?;
        to_count(total, "count")
    }
}
