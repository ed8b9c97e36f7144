//! Error types for the cohort pipeline.

use polars::prelude::PolarsError;
use thiserror::Error;

use cohort_ingest::IngestError;

/// Structural failures that abort a run. Data-quality problems are never
/// errors; they go to the review report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// No column resolved to the group key.
    #[error("export {source_name} has no group key column (expected one of: {expected})")]
    MissingGroupKey {
        source_name: String,
        expected: String,
    },

    /// The export has a header row but no data rows.
    #[error("export {source_name} contains no rows")]
    EmptyExport { source_name: String },

    /// Building an output table failed.
    #[error("failed to build {table} table: {source}")]
    Frame {
        table: &'static str,
        #[source]
        source: PolarsError,
    },
}

impl PipelineError {
    pub(crate) fn frame(table: &'static str) -> impl FnOnce(PolarsError) -> Self {
        move |source| PipelineError::Frame { table, source }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
