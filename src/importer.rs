//! Bulk import of wide-format spreadsheets.
//!
//! A sheet has an `area` column plus, per month, a `<mês> em dia` and a
//! `<mês> vencido` column. Decoding happens in full before anything is
//! written, so a structural problem never leaves a partial import behind.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::{info, warn};

use crate::loader::{CellValue, RawTable};
use crate::store::{RecordStore, Records, StoreError, UpsertOutcome};
use crate::types::Month;
use crate::util::{count_from_f64, normalize_header, normalize_label, parse_count_safe};

const AREA_HEADER: &str = "area";
const ON_TIME_SUFFIX: &str = "em dia";
const OVERDUE_SUFFIX: &str = "vencido";

/// Expected header pair for one month, already in normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthColumns {
    pub month: Month,
    pub on_time: Vec<String>,
    pub overdue: Vec<String>,
}

/// Header schema derived from the canonical month list. Março also answers
/// to `marco`.
pub static IMPORT_SCHEMA: Lazy<Vec<MonthColumns>> = Lazy::new(|| {
    Month::ALL
        .iter()
        .map(|&month| {
            let mut names = vec![month.display_name().to_lowercase()];
            if month == Month::Marco {
                names.push("marco".to_string());
            }
            MonthColumns {
                month,
                on_time: names.iter().map(|n| format!("{n} {ON_TIME_SUFFIX}")).collect(),
                overdue: names.iter().map(|n| format!("{n} {OVERDUE_SUFFIX}")).collect(),
            }
        })
        .collect()
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("O arquivo deve conter a coluna: area")]
    MissingAreaColumn,
}

/// One decoded (area, month, on time, overdue) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRecord {
    pub area: String,
    pub month: Month,
    pub on_time: u32,
    pub overdue: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Column positions of one represented month.
#[derive(Debug, Clone, Copy)]
struct MonthSlots {
    month: Month,
    on_time: usize,
    overdue: usize,
}

/// Decode a wide table into flat tuples, row by row, months in calendar
/// order. Bad cells become 0; duplicates are kept.
pub fn import_wide_table(raw: &RawTable) -> Result<Vec<ImportedRecord>, ImportError> {
    let positions: HashMap<String, usize> = raw
        .headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (normalize_header(h), idx))
        .rev() // first occurrence wins on duplicate headers
        .collect();

    let area_col = *positions
        .get(AREA_HEADER)
        .ok_or(ImportError::MissingAreaColumn)?;
    let slots = discover_months(&positions);
    if slots.is_empty() {
        warn!("Imported sheet has no complete month column pairs");
    }

    let mut out = Vec::with_capacity(raw.rows.len() * slots.len());
    for (line, row) in raw.rows.iter().enumerate() {
        let area = row.get(area_col).map(CellValue::as_text).unwrap_or_default();
        let area = normalize_label(&area);
        if area.is_empty() {
            warn!(row = line + 2, "Skipping row without area");
            continue;
        }
        for slot in &slots {
            out.push(ImportedRecord {
                area: area.clone(),
                month: slot.month,
                on_time: cell_count(row.get(slot.on_time)),
                overdue: cell_count(row.get(slot.overdue)),
            });
        }
    }
    Ok(out)
}

fn discover_months(positions: &HashMap<String, usize>) -> Vec<MonthSlots> {
    let find = |names: &[String]| names.iter().find_map(|n| positions.get(n).copied());
    IMPORT_SCHEMA
        .iter()
        .filter_map(|cols| {
            Some(MonthSlots {
                month: cols.month,
                on_time: find(&cols.on_time)?,
                overdue: find(&cols.overdue)?,
            })
        })
        .collect()
}

fn cell_count(cell: Option<&CellValue>) -> u32 {
    match cell {
        Some(CellValue::Number(v)) => count_from_f64(*v),
        Some(CellValue::Text(s)) => parse_count_safe(Some(s)),
        Some(CellValue::Empty) | None => 0,
    }
}

/// Feed decoded tuples through the upsert one at a time; the last tuple for a
/// given (area, month) is the one that sticks.
pub fn apply_import<S: RecordStore>(
    records: &mut Records<S>,
    imported: &[ImportedRecord],
) -> Result<ImportSummary, StoreError> {
    let mut summary = ImportSummary::default();
    for rec in imported {
        match records.upsert_record(
            &rec.area,
            &rec.month.storage_name(),
            rec.on_time,
            rec.overdue,
        )? {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated(_) => summary.updated += 1,
        }
    }
    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        "Applied spreadsheet import"
    );
    Ok(summary)
}
