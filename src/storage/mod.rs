//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! HealthLogService
//!     → LogStore (trait seam)
//!     → SqliteLogStore (sqlx pool)
//!         save:           assign UUID → anonymize patient id → INSERT (one tx)
//!         find_and_count: WHERE severity/timestamp → COUNT + ORDER/LIMIT/OFFSET
//!         stats_by_type:  GROUP BY severity|source
//!     → health_logs table
//! ```
//!
//! # Design Decisions
//! - Patient ids are replaced before the row is built; originals never reach SQL
//! - The read path never selects `patient_id`
//! - Timestamps are fixed-width UTC text so string order is time order

pub mod anonymize;
pub mod model;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

pub use model::{
    HealthLogEntry, LogFilters, LogPage, LogStats, NewHealthLog, Pagination, Severity, StatType,
};
pub use sqlite::SqliteLogStore;

/// Errors raised by a [`LogStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Query or write rejected by the database.
    #[error("{0}")]
    Database(sqlx::Error),

    /// No connection could be obtained from the pool.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded into the model.
    #[error("corrupt value in column {column}: {message}")]
    Corrupt {
        column: &'static str,
        message: String,
    },
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StorageError::Unavailable(err.to_string())
            }
            other => StorageError::Database(other),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence operations for health log entries.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persist every entry or none of them.
    async fn save(&self, entries: &[NewHealthLog]) -> StorageResult<()>;

    /// Matching rows for the page window plus the total match count.
    async fn find_and_count(
        &self,
        filters: &LogFilters,
        pagination: Pagination,
    ) -> StorageResult<LogPage>;

    /// Count of entries per distinct value of `stat`.
    async fn stats_by_type(&self, stat: StatType) -> StorageResult<LogStats>;

    /// Total number of stored entries.
    async fn count(&self) -> StorageResult<u64>;
}
