use std::path::PathBuf;

use serde::Serialize;

use cohort_core::Cohort;

/// Outcome of `cohort run`.
#[derive(Debug)]
pub struct RunResult {
    pub source: String,
    /// `None` on a dry run.
    pub outputs: Option<OutputPaths>,
    pub cohort: Cohort,
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub demographics: PathBuf,
    pub observations: PathBuf,
}

/// Headline counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CohortCounts {
    pub patients: usize,
    pub observations: usize,
    pub with_vte: usize,
    pub deaths: usize,
    pub withdrawn: usize,
    pub excluded: usize,
    pub not_enrolled: usize,
    pub review_issues: usize,
}

impl CohortCounts {
    pub fn from_cohort(cohort: &Cohort) -> Self {
        let mut counts = Self {
            patients: cohort.len(),
            observations: cohort.observation_count(),
            excluded: cohort.review().excluded.len(),
            not_enrolled: cohort.review().not_enrolled.len(),
            review_issues: cohort.review().issue_count(),
            ..Self::default()
        };
        for patient in cohort.patients() {
            let outcomes = patient.outcomes();
            counts.with_vte += usize::from(outcomes.has_vte());
            counts.deaths += usize::from(outcomes.death);
            counts.withdrawn += usize::from(outcomes.withdrawn);
        }
        counts
    }
}
