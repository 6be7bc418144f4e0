//! Orchestration between the HTTP handlers and the log store.

use std::sync::Arc;

use tracing::info;

use crate::observability::metrics;
use crate::storage::{
    LogFilters, LogPage, LogStats, LogStore, NewHealthLog, Pagination, StatType, StorageResult,
};

/// Pass-through service over a [`LogStore`].
#[derive(Clone)]
pub struct HealthLogService {
    store: Arc<dyn LogStore>,
}

impl HealthLogService {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Persist a batch of entries.
    pub async fn save(&self, entries: &[NewHealthLog]) -> StorageResult<()> {
        self.store.save(entries).await?;
        metrics::record_entries_saved(entries.len());
        info!(count = entries.len(), "Saved {} health logs from API.", entries.len());
        Ok(())
    }

    pub async fn get_logs(
        &self,
        filters: &LogFilters,
        pagination: Pagination,
    ) -> StorageResult<LogPage> {
        self.store.find_and_count(filters, pagination).await
    }

    pub async fn get_stats_by_type(&self, stat: StatType) -> StorageResult<LogStats> {
        self.store.stats_by_type(stat).await
    }

    /// Total stored entries.
    pub async fn count(&self) -> StorageResult<u64> {
        self.store.count().await
    }
}
