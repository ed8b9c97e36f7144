//! Reduction of repeated outcome rows to one patient-level state.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use cohort_model::{
    CanonicalField, Comorbidity, Complication, Outcomes, PatientId, ThrombosisCategory,
    ThrombosisKind, TimepointStage,
};
use cohort_standards::StudyConfig;

use crate::normalize::NormalizedRow;
use crate::review::ReviewReport;
use crate::timepoint::TimepointIndex;

/// Whether any row carries a truthy value for `field`.
fn any_truthy(rows: &[NormalizedRow], field: CanonicalField, config: &StudyConfig) -> bool {
    rows.iter()
        .filter_map(|row| row.get(field))
        .any(|value| config.values.is_truthy(value))
}

/// Reduce a patient's rows to outcome flags.
pub fn aggregate_outcomes(
    patient: &PatientId,
    rows: &[NormalizedRow],
    config: &StudyConfig,
    timepoints: &TimepointIndex,
    review: &mut ReviewReport,
) -> Outcomes {
    let dvt = any_truthy(rows, CanonicalField::Thrombosis(ThrombosisKind::Dvt), config);
    let pe = any_truthy(rows, CanonicalField::Thrombosis(ThrombosisKind::Pe), config);
    let thrombosis = config
        .thrombosis_overrides
        .get(patient)
        .copied()
        .or_else(|| ThrombosisCategory::from_flags(dvt, pe));

    let reasons: Vec<&str> = rows
        .iter()
        .filter_map(|row| row.get(CanonicalField::WithdrawalReason))
        .collect();
    let death = reasons
        .iter()
        .any(|reason| config.values.is_death_term(reason))
        || any_truthy(rows, CanonicalField::DeathFlag, config);
    let withdrawn = !death && !reasons.is_empty();

    let comorbidities: BTreeMap<Comorbidity, bool> = Comorbidity::ALL
        .into_iter()
        .map(|value| {
            (
                value,
                any_truthy(rows, CanonicalField::Comorbidity(value), config),
            )
        })
        .collect();
    let complications: BTreeMap<Complication, bool> = Complication::ALL
        .into_iter()
        .map(|value| {
            (
                value,
                any_truthy(rows, CanonicalField::Complication(value), config),
            )
        })
        .collect();

    let adverse_event_stage = config
        .adverse_events
        .get(patient)
        .copied()
        .or_else(|| recorded_event_stage(patient, rows, timepoints));

    let outcomes = Outcomes {
        dvt,
        pe,
        thrombosis,
        adverse_event_stage,
        death,
        withdrawn,
        comorbidities,
        complications,
        uti: config.uti_patients.contains(patient),
        transfused_rbc_units: transfused_units(patient, rows, review),
    };
    debug!(
        patient = %patient,
        vte = outcomes.has_vte(),
        death = outcomes.death,
        withdrawn = outcomes.withdrawn,
        "outcomes aggregated"
    );
    outcomes
}

/// First row-recorded adverse-event stage that resolves to a known stage.
fn recorded_event_stage(
    patient: &PatientId,
    rows: &[NormalizedRow],
    timepoints: &TimepointIndex,
) -> Option<TimepointStage> {
    rows.iter()
        .filter_map(|row| row.get(CanonicalField::AdverseEventStage))
        .find_map(|raw| {
            let stage = timepoints.canonicalize(raw).stage();
            if stage.is_none() {
                warn!(patient = %patient, value = raw, "unrecognised adverse-event stage");
            }
            stage
        })
}

fn transfused_units(patient: &PatientId, rows: &[NormalizedRow], review: &mut ReviewReport) -> f64 {
    rows.iter()
        .filter_map(|row| row.get(CanonicalField::TransfusionUnits))
        .filter_map(|raw| match raw.trim().parse::<f64>() {
            Ok(units) if units.is_finite() => Some(units),
            _ => {
                review.record_unparseable(patient, CanonicalField::TransfusionUnits, raw);
                None
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_standards::{TimepointDictionary, ValueVocabulary, load_default_config};
    use std::collections::BTreeSet;

    const DVT: CanonicalField = CanonicalField::Thrombosis(ThrombosisKind::Dvt);
    const PE: CanonicalField = CanonicalField::Thrombosis(ThrombosisKind::Pe);

    fn config() -> StudyConfig {
        let mut config = load_default_config().unwrap();
        config.values = ValueVocabulary {
            truthy: BTreeSet::from(["yes".into(), "checked".into(), "yes*".into()]),
            death_terms: BTreeSet::from(["death".into(), "deceased".into()]),
            ..ValueVocabulary::default()
        };
        config
    }

    fn patient(id: &str) -> PatientId {
        PatientId::new(id).unwrap()
    }

    fn rows(values: &[&[(CanonicalField, &str)]]) -> Vec<NormalizedRow> {
        values
            .iter()
            .enumerate()
            .map(|(index, fields)| {
                NormalizedRow::new(
                    index,
                    fields
                        .iter()
                        .map(|(field, value)| (*field, (*value).to_string()))
                        .collect(),
                )
            })
            .collect()
    }

    fn aggregate(id: &str, rows: &[NormalizedRow]) -> (Outcomes, ReviewReport) {
        let config = config();
        let index = TimepointIndex::build(&TimepointDictionary::default());
        let mut review = ReviewReport::default();
        let outcomes = aggregate_outcomes(&patient(id), rows, &config, &index, &mut review);
        (outcomes, review)
    }

    #[test]
    fn flags_are_or_over_rows() {
        let (positive, _) = aggregate("X-1", &rows(&[&[(DVT, "No")], &[(DVT, "No")], &[(DVT, "Yes")]]));
        assert!(positive.dvt);
        assert_eq!(positive.thrombosis, Some(ThrombosisCategory::Dvt));

        let (negative, _) = aggregate("X-1", &rows(&[&[(DVT, "No")], &[(DVT, "No")], &[(DVT, "No")]]));
        assert!(!negative.dvt);
        assert!(!negative.has_vte());
    }

    #[test]
    fn both_flags_make_both_category() {
        let (outcomes, _) = aggregate("X-1", &rows(&[&[(DVT, "Checked")], &[(PE, "yes*")]]));
        assert_eq!(outcomes.thrombosis, Some(ThrombosisCategory::Both));
    }

    #[test]
    fn configured_override_replaces_category() {
        let (outcomes, _) = aggregate("TF-075", &rows(&[&[(DVT, "No")]]));
        assert_eq!(outcomes.thrombosis, Some(ThrombosisCategory::Superficial));
        assert!(outcomes.has_vte());
        assert_eq!(outcomes.adverse_event_stage, Some(TimepointStage::Pod10));
    }

    #[test]
    fn death_dominates_withdrawal() {
        let reason = CanonicalField::WithdrawalReason;
        let (outcomes, _) = aggregate(
            "X-1",
            &rows(&[&[(reason, "Lost to follow-up")], &[(reason, " Death ")]]),
        );
        assert!(outcomes.death);
        assert!(!outcomes.withdrawn);

        let (outcomes, _) = aggregate("X-1", &rows(&[&[(reason, "Lost to follow-up")]]));
        assert!(!outcomes.death);
        assert!(outcomes.withdrawn);
    }

    #[test]
    fn death_flag_counts_as_death() {
        let (outcomes, _) = aggregate(
            "X-1",
            &rows(&[
                &[(CanonicalField::WithdrawalReason, "Moved away")],
                &[(CanonicalField::DeathFlag, "Checked")],
            ]),
        );
        assert!(outcomes.death);
        assert!(!outcomes.withdrawn);
    }

    #[test]
    fn transfusions_are_summed_and_garbage_reviewed() {
        let units = CanonicalField::TransfusionUnits;
        let (outcomes, review) =
            aggregate("X-1", &rows(&[&[(units, "2")], &[(units, "1.5")], &[(units, "two")]]));
        assert_eq!(outcomes.transfused_rbc_units, 3.5);
        assert!(outcomes.transfused());
        assert_eq!(review.unparseable_values.len(), 1);
    }

    #[test]
    fn row_recorded_event_stage_resolves_through_index() {
        let (outcomes, _) = aggregate(
            "X-1",
            &rows(&[
                &[(CanonicalField::AdverseEventStage, "whenever")],
                &[(CanonicalField::AdverseEventStage, "pod2")],
            ]),
        );
        assert_eq!(outcomes.adverse_event_stage, Some(TimepointStage::Pod2));
    }

    #[test]
    fn uti_comes_from_configuration() {
        let (outcomes, _) = aggregate("TH-247", &[]);
        assert!(outcomes.uti);
        assert!(!outcomes.comorbidity(Comorbidity::ALL[0]));
    }
}
