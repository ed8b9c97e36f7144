//! Domain types for longitudinal cohort timelines.
//!
//! - [`field`]: the canonical field vocabulary raw export columns resolve to
//! - [`timepoint`]: ordered clinical stages and canonicalized labels
//! - [`patient`]: patient identifiers, observations, and assembled timelines
//! - [`outcome`]: per-patient outcome flags

pub mod error;
pub mod field;
pub mod outcome;
pub mod patient;
pub mod timepoint;

pub use error::ModelError;
pub use field::{CanonicalField, Comorbidity, Complication, LabMetric, Panel, ThrombosisKind};
pub use outcome::{Outcomes, ThrombosisCategory, yes_no};
pub use patient::{
    Anchors, Demographics, DrawTimes, HourOffsets, Observation, Patient, PatientId, PatientParts,
    Transfusion, hours_between,
};
pub use timepoint::{TimepointLabel, TimepointStage};
