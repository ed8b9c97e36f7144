//! Normalization and record assembly for longitudinal cohort exports.
//!
//! [`CohortPipeline`] turns one raw export into a [`Cohort`]: per-patient
//! demographic snapshots, timestamped lab and coagulation observations with
//! hour offsets from clinical anchors, and aggregated outcome flags. Every
//! recoverable data-quality problem lands in the [`ReviewReport`].

pub mod assembly;
pub mod cohort;
pub mod datetime;
pub mod derive;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod outcome;
pub mod pipeline;
pub mod review;
pub mod schema;
pub mod score;
pub mod temporal;
pub mod timepoint;
pub mod truncation;

pub use assembly::{assemble_patient, demographic_snapshot, parse_metrics};
pub use cohort::Cohort;
pub use datetime::{ParsedDate, parse_date_cell, parse_time_cell};
pub use derive::DerivedColumns;
pub use error::{PipelineError, Result};
pub use identity::{PatientRows, apply_exclusions, resolve_identities, retain_enrolled};
pub use normalize::{NormalizedRow, normalize_rows};
pub use outcome::aggregate_outcomes;
pub use pipeline::CohortPipeline;
pub use review::{ReviewReport, ShadowedColumn, UnparseableValue, VariantCollision};
pub use schema::{ResolvedSchema, resolve_schema};
pub use score::scores_by_stage;
pub use temporal::TemporalAssembler;
pub use timepoint::{TimepointIndex, label_key, promote_pre_op_to_admission};
pub use truncation::truncate_after_event;
