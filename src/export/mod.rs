//! Spreadsheet and document exports of a pivot table.
//!
//! Both renderers take the already-shaped table plus an optional chart and
//! return the file bytes; writing them somewhere is the caller's job.

pub mod pdf;
pub mod xlsx;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::chart::ChartError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nada para exportar: a tabela está vazia.")]
    EmptyTable,
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),
    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Write export bytes to `path`, creating the parent directory if needed.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let write_err = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, bytes).map_err(write_err)?;
    info!(path = %path.display(), bytes = bytes.len(), "Wrote export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saida").join("x.bin");
        write_file(&path, b"abc").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }
}
