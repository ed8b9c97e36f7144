//! Error types for export ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading an export.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Export file not found.
    #[error("export file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to open or read the export.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV record.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// The export has no header row.
    #[error("export is empty: {source_name}")]
    EmptyExport { source_name: String },
}

impl IngestError {
    pub(crate) fn from_csv(path: &std::path::Path, error: csv::Error) -> Self {
        let path = path.to_path_buf();
        if !error.is_io_error() {
            return IngestError::CsvParse {
                path,
                message: error.to_string(),
            };
        }
        match error.into_kind() {
            csv::ErrorKind::Io(source) if source.kind() == std::io::ErrorKind::NotFound => {
                IngestError::FileNotFound { path }
            }
            csv::ErrorKind::Io(source) => IngestError::FileRead { path, source },
            other => IngestError::CsvParse {
                path,
                message: format!("{other:?}"),
            },
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
