use thiserror::Error;

use crate::chart::ChartError;
use crate::comparison::ComparisonError;
use crate::config::ConfigError;
use crate::export::ExportError;
use crate::importer::ImportError;
use crate::loader::LoadError;
use crate::logging::LoggingError;
use crate::output::OutputError;
use crate::store::StoreError;

/// Top-level error for one dashboard action.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Could not read spreadsheet: {0}")]
    Load(#[from] LoadError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Month;

    #[test]
    fn test_same_month_message_passes_through() {
        let err = AppError::from(ComparisonError::SameMonth(Month::Maio));
        assert_eq!(
            err.to_string(),
            "Selecione dois meses diferentes (Maio escolhido duas vezes)."
        );
    }

    #[test]
    fn test_import_error_display() {
        let err = AppError::from(ImportError::MissingAreaColumn);
        assert!(err.to_string().contains("area"));
    }

    #[test]
    fn test_output_failure_keeps_its_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "negado");
        let err = AppError::from(OutputError::Io {
            path: "saida/resumo.json".into(),
            source: io,
        });
        assert!(matches!(err, AppError::Output(_)));
        assert!(err.to_string().starts_with("Output error: Could not write saida/resumo.json"));
    }
}
