//! Audit-trail tables and their batched truncation.
//!
//! Stores keep append-only trail tables (sync history, event delivery
//! logs). Trails grow without bound, so maintenance deletes rows older
//! than a cutoff in fixed-size batches rather than in one sweep; a table
//! that fails to truncate is logged and skipped so the remaining tables
//! still get cleaned.

use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// One row of an audit trail table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailRow {
    /// Milliseconds since the epoch at which the action was recorded.
    pub timestamp_ms: u64,
    /// Free-form description of the recorded action.
    pub message: String,
}

impl TrailRow {
    /// Creates a row.
    pub fn new(timestamp_ms: u64, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            message: message.into(),
        }
    }
}

/// The named trail tables of one store.
#[derive(Debug, Default)]
pub struct TrailStore {
    tables: RwLock<HashMap<String, Vec<TrailRow>>>,
}

impl TrailStore {
    /// Creates an empty trail store with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table; existing tables are kept as-is.
    pub fn define_table(&self, name: impl Into<String>) {
        self.tables.write().entry(name.into()).or_default();
    }

    /// Appends a row to a table.
    pub fn append(&self, table: &str, row: TrailRow) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTrailTable {
                name: table.to_string(),
            })?;
        rows.push(row);
        Ok(())
    }

    /// Returns the number of rows in a table.
    pub fn len(&self, table: &str) -> StoreResult<usize> {
        self.tables
            .read()
            .get(table)
            .map(Vec::len)
            .ok_or_else(|| StoreError::UnknownTrailTable {
                name: table.to_string(),
            })
    }

    /// Returns true if a table has no rows.
    pub fn is_empty(&self, table: &str) -> StoreResult<bool> {
        Ok(self.len(table)? == 0)
    }

    /// Deletes up to `max` rows older than `cutoff_ms` from a table and
    /// returns the number actually deleted. Each call is atomic.
    pub fn delete_batch(&self, table: &str, cutoff_ms: u64, max: usize) -> StoreResult<usize> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTrailTable {
                name: table.to_string(),
            })?;
        let mut deleted = 0;
        rows.retain(|row| {
            if deleted < max && row.timestamp_ms < cutoff_ms {
                deleted += 1;
                false
            } else {
                true
            }
        });
        Ok(deleted)
    }
}

/// Truncates rows older than `cutoff_ms` from the named trail tables, in
/// batches of `batch_size` rows.
///
/// Each table is drained with repeated batch deletes until a batch deletes
/// nothing. A table that cannot be truncated is logged and skipped; the
/// remaining tables are still processed. Returns the total number of rows
/// removed.
pub fn truncate_trails(
    trails: &TrailStore,
    tables: &[&str],
    cutoff_ms: u64,
    batch_size: usize,
) -> usize {
    let batch_size = batch_size.max(1);
    let mut total = 0;
    for table in tables {
        tracing::debug!(table, cutoff_ms, "truncating trail table");
        loop {
            match trails.delete_batch(table, cutoff_ms, batch_size) {
                Ok(0) => break,
                Ok(deleted) => total += deleted,
                Err(err) => {
                    tracing::warn!(table, error = %err, "trail truncation skipped table");
                    break;
                }
            }
        }
    }
    total
}
