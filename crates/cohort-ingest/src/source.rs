use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::table::{RawTable, normalize_cell, normalize_header};

/// Where a study export comes from.
///
/// The pipeline fetches exactly once per run; implementations return the
/// full snapshot.
pub trait ExportSource {
    /// Read the whole export.
    fn fetch(&self) -> Result<RawTable>;

    /// Human-readable name for logs and error messages.
    fn describe(&self) -> String;
}

impl ExportSource for RawTable {
    fn fetch(&self) -> Result<RawTable> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        "<in-memory table>".to_string()
    }
}

/// A flat CSV export with one header row.
#[derive(Debug, Clone)]
pub struct CsvExport {
    path: PathBuf,
    delimiter: u8,
}

impl CsvExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExportSource for CsvExport {
    fn fetch(&self) -> Result<RawTable> {
        read_export(&self.path, self.delimiter)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn read_export(path: &Path, delimiter: u8) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| IngestError::from_csv(path, e))?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut skipped_blank = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::from_csv(path, e))?;
        let cells: Vec<Option<String>> = record.iter().map(normalize_cell).collect();
        if cells.iter().all(Option::is_none) {
            skipped_blank += 1;
            continue;
        }
        match headers {
            None => headers = Some(record.iter().map(normalize_header).collect()),
            Some(_) => rows.push(cells),
        }
    }

    let Some(headers) = headers else {
        return Err(IngestError::EmptyExport {
            source_name: path.display().to_string(),
        });
    };
    if skipped_blank > 0 {
        debug!(path = %path.display(), skipped_blank, "skipped blank export lines");
    }
    let table = RawTable::new(headers, rows);
    info!(
        path = %path.display(),
        columns = table.headers().len(),
        rows = table.row_count(),
        "read export"
    );
    Ok(table)
}
