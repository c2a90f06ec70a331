use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use thiserror::Error;

use crate::types::{HeaderStyle, PivotTable};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Could not write CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("Could not encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Wide table to CSV with the same headers as the spreadsheet export, so the
/// file can be fed straight back into the importer.
pub fn write_pivot_csv(path: &Path, table: &PivotTable) -> Result<(), OutputError> {
    let csv_err = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record(table.headers(HeaderStyle::Export))
        .map_err(csv_err)?;
    for row in table.string_rows() {
        wtr.write_record(&row).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Markdown rendering of a pivot, headers in on-screen style.
pub fn render_pivot(table: &PivotTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.headers(HeaderStyle::Display));
    for row in table.string_rows() {
        builder.push_record(row);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn preview_pivot(table: &PivotTable) {
    if table.is_empty() {
        println!("(sem linhas)\n");
        return;
    }
    println!("{}\n", render_pivot(table));
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(sem linhas)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
