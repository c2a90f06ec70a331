//! PostgREST-style table access (the hosted `treinamentos` table).
//!
//! Filters are pushed down as `column=eq.value` query parameters; nothing
//! beyond equality is ever sent to the server.

use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{RecordId, RecordStore, StoreError};
use crate::types::{NewRecord, StoredRecord};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
const REST_PATH: &str = "rest/v1";

fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .build()
    })
}

#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    table: String,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: RecordId,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            table: table.trim().to_string(),
        }
    }

    pub fn table_url(&self) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, self.table)
    }

    fn request(&self, method: &str) -> ureq::Request {
        agent()
            .request(method, &self.table_url())
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "application/json")
    }
}

/// `column=eq.value` filter operand.
fn eq_filter(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn call(result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, StoreError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(StoreError::Status { status, body })
        }
        Err(ureq::Error::Transport(err)) => Err(StoreError::Transport(err.to_string())),
    }
}

impl RecordStore for RestStore {
    fn select_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let response = call(self.request("GET").query("select", "*").call())?;
        let rows: Vec<StoredRecord> = response
            .into_json()
            .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
        debug!(rows = rows.len(), table = %self.table, "Selected all rows");
        Ok(rows)
    }

    fn find_id(&self, area: &str, month: &str) -> Result<Option<RecordId>, StoreError> {
        let response = call(
            self.request("GET")
                .query("select", "id")
                .query("area", &eq_filter(area))
                .query("mes", &eq_filter(month))
                .call(),
        )?;
        let rows: Vec<IdRow> = response
            .into_json()
            .map_err(|err| StoreError::InvalidResponse(err.to_string()))?;
        Ok(rows.first().map(|row| row.id))
    }

    fn insert(&mut self, record: &NewRecord) -> Result<(), StoreError> {
        call(
            self.request("POST")
                .set("Content-Type", "application/json")
                .set("Prefer", "return=minimal")
                .send_json(record),
        )?;
        Ok(())
    }

    fn update_counts(
        &mut self,
        id: RecordId,
        on_time: u32,
        overdue: u32,
    ) -> Result<(), StoreError> {
        call(
            self.request("PATCH")
                .query("id", &eq_filter(id))
                .set("Content-Type", "application/json")
                .set("Prefer", "return=minimal")
                .send_json(serde_json::json!({ "em_dia": on_time, "vencido": overdue })),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_trims_slashes() {
        let store = RestStore::new(" https://abc.supabase.co/ ", "key", "treinamentos");
        assert_eq!(
            store.table_url(),
            "https://abc.supabase.co/rest/v1/treinamentos"
        );
    }

    #[test]
    fn test_eq_filter() {
        assert_eq!(eq_filter("RH"), "eq.RH");
        assert_eq!(eq_filter(12), "eq.12");
    }

    #[test]
    fn test_insert_payload_uses_table_columns() {
        let payload = serde_json::to_value(NewRecord {
            area: "RH".into(),
            month: "JANEIRO".into(),
            on_time: 5,
            overdue: 1,
        })
        .unwrap();
        assert_eq!(
            payload,
            serde_json::json!({"area": "RH", "mes": "JANEIRO", "em_dia": 5, "vencido": 1})
        );
    }

    #[test]
    fn test_unreachable_host_is_transport_error() {
        let store = RestStore::new("http://127.0.0.1:9", "key", "treinamentos");
        let err = store.select_all().unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
