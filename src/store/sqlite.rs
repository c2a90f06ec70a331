use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use super::{RecordId, RecordStore, StoreError};
use crate::types::{NewRecord, StoredRecord};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite file holding the `treinamentos` table, for offline use.
pub struct SqliteStore {
    connection: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self {
            connection,
            path: Some(path.to_path_buf()),
        };
        store.apply_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            connection: Connection::open_in_memory()?,
            path: None,
        };
        store.apply_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn apply_schema(&self) -> Result<(), StoreError> {
        // No UNIQUE(area, mes): the hosted table has none either and the
        // adapter enforces the pair by upserting.
        self.connection.busy_timeout(BUSY_TIMEOUT)?;
        self.connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS treinamentos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                area TEXT NOT NULL,
                mes TEXT NOT NULL,
                em_dia INTEGER NOT NULL DEFAULT 0,
                vencido INTEGER NOT NULL DEFAULT 0
             );
             CREATE INDEX IF NOT EXISTS idx_treinamentos_area_mes
                ON treinamentos (area, mes);",
        )?;
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn select_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let mut stmt = self
            .connection
            .prepare("SELECT id, area, mes, em_dia, vencido FROM treinamentos ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRecord {
                    id: row.get(0)?,
                    area: row.get(1)?,
                    month: row.get(2)?,
                    on_time: row.get::<_, i64>(3)?.max(0) as u32,
                    overdue: row.get::<_, i64>(4)?.max(0) as u32,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_id(&self, area: &str, month: &str) -> Result<Option<RecordId>, StoreError> {
        let id = self
            .connection
            .query_row(
                "SELECT id FROM treinamentos WHERE area = ?1 AND mes = ?2 ORDER BY id ASC LIMIT 1",
                params![area, month],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert(&mut self, record: &NewRecord) -> Result<(), StoreError> {
        self.connection.execute(
            "INSERT INTO treinamentos (area, mes, em_dia, vencido) VALUES (?1, ?2, ?3, ?4)",
            params![record.area, record.month, record.on_time, record.overdue],
        )?;
        Ok(())
    }

    fn update_counts(
        &mut self,
        id: RecordId,
        on_time: u32,
        overdue: u32,
    ) -> Result<(), StoreError> {
        let changed = self.connection.execute(
            "UPDATE treinamentos SET em_dia = ?1, vencido = ?2 WHERE id = ?3",
            params![on_time, overdue, id],
        )?;
        if changed == 0 {
            return Err(StoreError::MissingRecord(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Records, UpsertOutcome};

    #[test]
    fn test_schema_starts_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.select_all().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_through_sqlite() {
        let mut records = Records::new(SqliteStore::open_in_memory().unwrap());
        assert_eq!(
            records.upsert_record("rh", "janeiro", 10, 2).unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            records.upsert_record("RH", "JANEIRO", 11, 0).unwrap(),
            UpsertOutcome::Updated(1)
        );
        let rows = records.store().select_all().unwrap();
        assert_eq!(
            rows,
            vec![StoredRecord {
                id: 1,
                area: "RH".into(),
                month: "JANEIRO".into(),
                on_time: 11,
                overdue: 0,
            }]
        );
    }

    #[test]
    fn test_update_missing_row_reports_id() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store.update_counts(5, 1, 1).unwrap_err();
        assert!(matches!(err, StoreError::MissingRecord(5)));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treinamentos.db");
        {
            let mut records = Records::new(SqliteStore::open(&path).unwrap());
            records.upsert_record("TI", "Maio", 3, 4).unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.find_id("TI", "MAIO").unwrap(), Some(1));
    }
}
