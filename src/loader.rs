// Reads uploaded spreadsheets into a neutral header + rows table.
//
// The importer never sees calamine or csv types; it only gets `RawTable`.
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(v) if v.fract() == 0.0 && v.is_finite() => format!("{}", *v as i64),
            CellValue::Number(v) => v.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<u32> for CellValue {
    fn from(v: u32) -> Self {
        CellValue::Number(v as f64)
    }
}

/// First row is the header; the rest are data rows (ragged rows allowed).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(PathBuf),
    #[error("Could not read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },
    #[error("Workbook {0} has no worksheets")]
    NoWorksheet(PathBuf),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Load `.xlsx`/`.xls`/`.xlsb`/`.ods` (first worksheet) or `.csv`.
pub fn load_raw_table(path: impl AsRef<Path>) -> Result<RawTable, LoadError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let table = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => load_workbook(path)?,
        "csv" => load_csv(path)?,
        _ => return Err(LoadError::UnsupportedExtension(path.to_path_buf())),
    };
    info!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "Loaded spreadsheet"
    );
    Ok(table)
}

pub fn load_workbook(path: &Path) -> Result<RawTable, LoadError> {
    let workbook_err = |message: String| LoadError::Workbook {
        path: path.to_path_buf(),
        message,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::NoWorksheet(path.to_path_buf()))?
        .map_err(|e| workbook_err(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(RawTable::default());
    };
    Ok(RawTable {
        headers: header.iter().map(|c| cell_from_data(c).as_text()).collect(),
        rows: rows
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect(),
    })
}

pub fn load_csv(path: &Path) -> Result<RawTable, LoadError> {
    let rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    read_csv(rdr)
}

/// Parse CSV from any reader; cells stay text and get coerced later.
pub fn read_csv<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<RawTable, LoadError> {
    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    let mut bad_rows = 0usize;
    for result in rdr.records() {
        match result {
            Ok(record) => rows.push(
                record
                    .iter()
                    .map(|s| {
                        if s.trim().is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(s.to_string())
                        }
                    })
                    .collect(),
            ),
            Err(_) => bad_rows += 1,
        }
    }
    if bad_rows > 0 {
        warn!(bad_rows, "Skipped unreadable CSV rows");
    }
    Ok(RawTable { headers, rows })
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::Float(v) => CellValue::Number(*v),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_keeps_header_and_blanks() {
        let data = "area,janeiro em dia,janeiro vencido\nRH,5,\nTI,3,x\n";
        let rdr = ReaderBuilder::new().from_reader(data.as_bytes());
        let table = read_csv(rdr).unwrap();
        assert_eq!(table.headers, vec!["area", "janeiro em dia", "janeiro vencido"]);
        assert_eq!(
            table.rows[0],
            vec![CellValue::from("RH"), CellValue::from("5"), CellValue::Empty]
        );
        assert_eq!(table.rows[1][2], CellValue::from("x"));
    }

    #[test]
    fn test_cell_from_data() {
        assert_eq!(cell_from_data(&Data::Int(4)), CellValue::Number(4.0));
        assert_eq!(cell_from_data(&Data::String("  ".into())), CellValue::Empty);
        assert_eq!(cell_from_data(&Data::Empty), CellValue::Empty);
    }

    #[test]
    fn test_number_as_text_drops_trailing_zero() {
        assert_eq!(CellValue::Number(5.0).as_text(), "5");
        assert_eq!(CellValue::Number(5.5).as_text(), "5.5");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_raw_table("dados.txt").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_load_csv_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.csv");
        std::fs::write(&path, "Area,Maio Em Dia,Maio Vencido\nrh,1,2\n").unwrap();
        let table = load_raw_table(&path).unwrap();
        assert_eq!(table.headers[0], "Area");
        assert_eq!(table.rows.len(), 1);
    }
}
