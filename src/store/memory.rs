use super::{RecordId, RecordStore, StoreError};
use crate::types::{NewRecord, StoredRecord};

/// `Vec`-backed store with a simple id counter. Matching is exact, like the
/// remote table's equality filters.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    rows: Vec<StoredRecord>,
    next_id: RecordId,
}

impl MemoryStore {
    /// Seed with rows as they would already exist in the table.
    pub fn with_rows(rows: Vec<StoredRecord>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0);
        Self { rows, next_id }
    }
}

impl RecordStore for MemoryStore {
    fn select_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self.rows.clone())
    }

    fn find_id(&self, area: &str, month: &str) -> Result<Option<RecordId>, StoreError> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.area == area && r.month == month)
            .map(|r| r.id))
    }

    fn insert(&mut self, record: &NewRecord) -> Result<(), StoreError> {
        self.next_id += 1;
        self.rows.push(StoredRecord {
            id: self.next_id,
            area: record.area.clone(),
            month: record.month.clone(),
            on_time: record.on_time,
            overdue: record.overdue,
        });
        Ok(())
    }

    fn update_counts(
        &mut self,
        id: RecordId,
        on_time: u32,
        overdue: u32,
    ) -> Result<(), StoreError> {
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::MissingRecord(id))?;
        row.on_time = on_time;
        row.overdue = overdue;
        Ok(())
    }
}
