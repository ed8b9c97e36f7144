//! Post-event truncation of coagulation measurements.

use cohort_model::{Observation, Panel, TimepointStage};

/// Null the coagulation panel of every observation ranked strictly after
/// `event`. Returns the number of values cleared.
///
/// Observations without a ranked stage are left alone, as is everything
/// when the event stage is unknown or unranked.
pub fn truncate_after_event(observations: &mut [Observation], event: Option<TimepointStage>) -> usize {
    let Some(event_rank) = event.and_then(|stage| stage.rank()) else {
        return 0;
    };
    observations
        .iter_mut()
        .filter(|observation| {
            observation
                .timepoint()
                .and_then(|label| label.rank())
                .is_some_and(|rank| rank > event_rank)
        })
        .map(|observation| observation.clear_panel(Panel::Coagulation))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_model::{DrawTimes, HourOffsets, LabMetric, TimepointLabel};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn observation(label: Option<TimepointLabel>) -> Observation {
        let metrics = BTreeMap::from([
            (LabMetric::Hemoglobin, 110.0),
            (LabMetric::Ma, 60.0),
            (LabMetric::Ly30, 1.2),
        ]);
        Observation::new(label, DrawTimes::default(), metrics, HourOffsets::default())
    }

    fn resolved(stage: TimepointStage) -> Option<TimepointLabel> {
        Some(TimepointLabel::Resolved(stage))
    }

    #[test]
    fn clears_only_later_coagulation_values() {
        let mut observations = vec![
            observation(resolved(TimepointStage::Pod1)),
            observation(resolved(TimepointStage::Pod2)),
            observation(resolved(TimepointStage::Pod3)),
        ];
        let cleared = truncate_after_event(&mut observations, Some(TimepointStage::Pod2));
        assert_eq!(cleared, 2);
        assert_eq!(observations[1].metric(LabMetric::Ma), Some(60.0));
        assert_eq!(observations[2].metric(LabMetric::Ma), None);
        assert_eq!(observations[2].metric(LabMetric::Hemoglobin), Some(110.0));
    }

    #[test]
    fn unranked_labels_are_untouched() {
        let mut observations = vec![
            observation(None),
            observation(Some(TimepointLabel::Unresolved("Visit 9".into()))),
            observation(resolved(TimepointStage::Unscheduled)),
        ];
        assert_eq!(
            truncate_after_event(&mut observations, Some(TimepointStage::Admission)),
            0
        );
        assert_eq!(truncate_after_event(&mut observations, None), 0);
        assert_eq!(
            truncate_after_event(&mut observations, Some(TimepointStage::Unscheduled)),
            0
        );
    }

    #[test]
    fn post_fracture_and_month6_draws_are_never_truncated() {
        let mut observations = vec![
            observation(resolved(TimepointStage::Pfd2)),
            observation(resolved(TimepointStage::Month6)),
            observation(resolved(TimepointStage::Week2)),
        ];
        assert_eq!(
            truncate_after_event(&mut observations, Some(TimepointStage::Pfd1)),
            0
        );
        assert_eq!(
            truncate_after_event(&mut observations, Some(TimepointStage::Pod1)),
            2
        );
        assert_eq!(observations[0].metric(LabMetric::Ma), Some(60.0));
        assert_eq!(observations[1].metric(LabMetric::Ma), Some(60.0));
        assert_eq!(observations[2].metric(LabMetric::Ma), None);
    }

    proptest! {
        #[test]
        fn truncation_is_idempotent(
            stages in proptest::collection::vec(0..TimepointStage::ALL.len(), 0..12),
            event in proptest::option::of(0..TimepointStage::ALL.len()),
        ) {
            let event = event.map(|index| TimepointStage::ALL[index]);
            let mut once: Vec<Observation> = stages
                .iter()
                .map(|&index| observation(resolved(TimepointStage::ALL[index])))
                .collect();
            truncate_after_event(&mut once, event);
            let mut twice = once.clone();
            prop_assert_eq!(truncate_after_event(&mut twice, event), 0);
            prop_assert_eq!(once, twice);
        }
    }
}
