//! Record store adapter.
//!
//! The store itself only knows four calls: select everything, match one
//! (area, month) pair, insert a row and update a row's counts by id. The
//! [`Records`] adapter builds the upsert and read helpers on top and is the
//! single place where labels get normalized before they reach the rest of
//! the crate.

mod memory;
mod rest;
mod sqlite;

pub use memory::MemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{NewRecord, StoredRecord, TrainingRecord};
use crate::util::normalize_label;

/// Opaque identifier assigned by the store on insert.
pub type RecordId = i64;

/// Errors returned by any store backend. Transient and permanent failures are
/// not told apart; callers treat all of them as terminal for one operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Could not open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Record {0} not found")]
    MissingRecord(RecordId),
}

/// Minimal query surface of a tabular record store.
pub trait RecordStore {
    /// Every row, unfiltered.
    fn select_all(&self) -> Result<Vec<StoredRecord>, StoreError>;

    /// Id of the first row whose `area` and `mes` equal the given values.
    fn find_id(&self, area: &str, month: &str) -> Result<Option<RecordId>, StoreError>;

    fn insert(&mut self, record: &NewRecord) -> Result<(), StoreError>;

    fn update_counts(
        &mut self,
        id: RecordId,
        on_time: u32,
        overdue: u32,
    ) -> Result<(), StoreError>;
}

/// What an upsert ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated(RecordId),
}

/// Normalized snapshot of the store. Empty means the table has no rows,
/// which is a normal state rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    pub records: Vec<TrainingRecord>,
}

impl RecordSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn as_slice(&self) -> &[TrainingRecord] {
        &self.records
    }
}

/// Adapter that keeps every read and write on normalized labels.
pub struct Records<S> {
    store: S,
}

impl<S: RecordStore> Records<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Insert or fully replace the counts for an (area, month) pair.
    ///
    /// The lookup and the write are separate calls with no isolation between
    /// them, so two sessions racing on a brand-new key can both insert.
    pub fn upsert_record(
        &mut self,
        area: &str,
        month: &str,
        on_time: u32,
        overdue: u32,
    ) -> Result<UpsertOutcome, StoreError> {
        let area = normalize_label(area);
        let month = normalize_label(month);

        match self.store.find_id(&area, &month)? {
            Some(id) => {
                self.store.update_counts(id, on_time, overdue)?;
                info!(%area, %month, on_time, overdue, id, "Updated training record");
                Ok(UpsertOutcome::Updated(id))
            }
            None => {
                self.store.insert(&NewRecord {
                    area: area.clone(),
                    month: month.clone(),
                    on_time,
                    overdue,
                })?;
                info!(%area, %month, on_time, overdue, "Inserted training record");
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    /// Every stored record with labels normalized.
    pub fn fetch_all(&self) -> Result<RecordSet, StoreError> {
        let rows = self.store.select_all()?;
        if rows.is_empty() {
            info!("Record store returned no rows");
        } else {
            debug!(rows = rows.len(), "Fetched training records");
        }
        let records = rows
            .into_iter()
            .filter(|row| {
                let keep = !row.area.trim().is_empty();
                if !keep {
                    warn!(id = row.id, "Skipping stored row without area");
                }
                keep
            })
            .map(TrainingRecord::from)
            .collect();
        Ok(RecordSet { records })
    }

    /// Sorted, de-duplicated normalized area names.
    pub fn fetch_distinct_areas(&self) -> Result<BTreeSet<String>, StoreError> {
        let rows = self.store.select_all()?;
        Ok(rows
            .iter()
            .map(|row| normalize_label(&row.area))
            .filter(|area| !area.is_empty())
            .collect())
    }
}
