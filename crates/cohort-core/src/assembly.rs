//! Record assembly: one immutable [`Patient`] per resolved identity.

use std::collections::BTreeMap;

use cohort_model::{
    CanonicalField, Demographics, LabMetric, Observation, Patient, PatientId, PatientParts,
};

use crate::normalize::NormalizedRow;
use crate::review::ReviewReport;

/// First non-null value per demographic field, in row order.
pub fn demographic_snapshot(rows: &[NormalizedRow]) -> Demographics {
    let mut values = BTreeMap::new();
    for field in CanonicalField::demographics() {
        if let Some(value) = rows.iter().find_map(|row| row.get(field)) {
            values.insert(field, value.to_string());
        }
    }
    Demographics::new(values)
}

/// Numeric metric values of one row. Values that are not numbers are
/// recorded for review and left out.
pub fn parse_metrics(
    patient: &PatientId,
    row: &NormalizedRow,
    review: &mut ReviewReport,
) -> BTreeMap<LabMetric, f64> {
    let mut metrics = BTreeMap::new();
    for metric in LabMetric::ALL {
        let field = CanonicalField::Metric(metric);
        let Some(raw) = row.get(field) else {
            continue;
        };
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => {
                metrics.insert(metric, value);
            }
            _ => review.record_unparseable(patient, field, raw),
        }
    }
    metrics
}

/// Build the patient, keeping only observations that still carry a metric.
pub fn assemble_patient(rows: &[NormalizedRow], mut parts: PatientParts) -> Patient {
    parts.observations.retain(Observation::has_any_metric);
    parts.demographics = demographic_snapshot(rows);
    Patient::from_parts(parts)
}
