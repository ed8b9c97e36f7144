//! Data-quality findings collected during a run.
//!
//! Nothing here is fatal. Every anomaly the pipeline recovers from is
//! recorded so it can be reviewed after the run.

use std::collections::BTreeMap;

use cohort_model::{CanonicalField, PatientId, TimepointStage};

/// A raw column dropped because an earlier column already claimed its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedColumn {
    pub column: String,
    pub field: CanonicalField,
    /// Column that kept the field.
    pub kept: String,
}

/// A timepoint variant declared under more than one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCollision {
    pub variant: String,
    pub kept: TimepointStage,
    pub ignored: TimepointStage,
}

/// A cell whose value could not be interpreted for its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparseableValue {
    pub patient: PatientId,
    pub field: CanonicalField,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewReport {
    /// Export columns with no synonym rule.
    pub unknown_columns: Vec<String>,
    pub shadowed_columns: Vec<ShadowedColumn>,
    pub timepoint_collisions: Vec<VariantCollision>,
    /// Unresolved timepoint labels with their row counts.
    pub unresolved_timepoints: BTreeMap<String, usize>,
    pub unparseable_values: Vec<UnparseableValue>,
    /// Excluded patients and the reason.
    pub excluded: BTreeMap<PatientId, String>,
    pub not_enrolled: Vec<PatientId>,
    /// Rows dropped because no patient ID could be resolved.
    pub unidentified_rows: usize,
}

impl ReviewReport {
    pub fn record_unresolved_timepoint(&mut self, raw: &str) {
        *self
            .unresolved_timepoints
            .entry(raw.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_unparseable(&mut self, patient: &PatientId, field: CanonicalField, value: &str) {
        self.unparseable_values.push(UnparseableValue {
            patient: patient.clone(),
            field,
            value: value.to_string(),
        });
    }

    /// Number of findings that call for a human look.
    pub fn issue_count(&self) -> usize {
        self.unknown_columns.len()
            + self.shadowed_columns.len()
            + self.timepoint_collisions.len()
            + self.unresolved_timepoints.len()
            + self.unparseable_values.len()
            + self.unidentified_rows
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_unresolved_labels_per_spelling() {
        let mut report = ReviewReport::default();
        report.record_unresolved_timepoint("Visit X");
        report.record_unresolved_timepoint("Visit X");
        report.record_unresolved_timepoint("Visit Y");
        assert_eq!(report.unresolved_timepoints["Visit X"], 2);
        assert_eq!(report.issue_count(), 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn exclusions_are_not_issues() {
        let mut report = ReviewReport::default();
        report
            .excluded
            .insert(PatientId::new("TH-226").unwrap(), "Treated non-operatively".into());
        assert!(report.is_clean());
    }
}
