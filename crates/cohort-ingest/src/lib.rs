//! Export ingestion for the cohort timeline pipeline.
//!
//! Reads a capture-system export into a [`RawTable`]: ordered headers and
//! ordered rows of optional string cells. No interpretation happens here;
//! field resolution and value normalization belong to the pipeline.

pub mod error;
pub mod source;
pub mod table;

pub use error::{IngestError, Result};
pub use source::{CsvExport, ExportSource};
pub use table::{RawTable, normalize_cell, normalize_header};
