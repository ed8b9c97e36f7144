//! Clinical assessment scores keyed by timepoint.

use std::collections::BTreeMap;

use tracing::debug;

use cohort_model::{CanonicalField, PatientId, TimepointLabel, TimepointStage};

use crate::normalize::NormalizedRow;
use crate::review::ReviewReport;
use crate::timepoint::TimepointIndex;

/// Assessment scores of one patient by canonical stage.
///
/// A score is recorded with its own timepoint label, usually on a different
/// row than the draw it belongs to. The first numeric score per stage wins;
/// scores without a resolvable label are dropped.
pub fn scores_by_stage(
    patient: &PatientId,
    rows: &[NormalizedRow],
    timepoints: &TimepointIndex,
    review: &mut ReviewReport,
) -> BTreeMap<TimepointStage, f64> {
    let mut scores = BTreeMap::new();
    for row in rows {
        let Some(raw) = row.get(CanonicalField::CasScore) else {
            continue;
        };
        let score = match raw.trim().parse::<f64>() {
            Ok(score) if score.is_finite() => score,
            _ => {
                review.record_unparseable(patient, CanonicalField::CasScore, raw);
                continue;
            }
        };
        let Some(label) = row.get(CanonicalField::CasTimepoint) else {
            debug!(patient = %patient, score, "assessment score without timepoint dropped");
            continue;
        };
        match timepoints.canonicalize(label) {
            TimepointLabel::Resolved(stage) => {
                scores.entry(stage).or_insert(score);
            }
            TimepointLabel::Unresolved(text) => review.record_unresolved_timepoint(&text),
        }
    }
    scores
}
