//! The assembled cohort and its tabular views.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use polars::prelude::*;

use cohort_model::{
    CanonicalField, Comorbidity, Complication, LabMetric, Outcomes, Patient, PatientId, yes_no,
};

use crate::error::{PipelineError, Result};
use crate::review::ReviewReport;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn timestamp(value: Option<NaiveDateTime>) -> Option<String> {
    value.map(|value| value.format(TIMESTAMP_FORMAT).to_string())
}

/// Result of one pipeline run: every retained patient plus the review report.
#[derive(Debug, Clone, Default)]
pub struct Cohort {
    patients: BTreeMap<PatientId, Patient>,
    review: ReviewReport,
}

impl Cohort {
    pub fn new(patients: impl IntoIterator<Item = Patient>, review: ReviewReport) -> Self {
        Self {
            patients: patients
                .into_iter()
                .map(|patient| (patient.id().clone(), patient))
                .collect(),
            review,
        }
    }

    /// Look up a patient; the ID is normalized the same way as export IDs.
    pub fn get_patient(&self, id: &str) -> Option<&Patient> {
        let id = PatientId::new(id).ok()?;
        self.patients.get(&id)
    }

    /// Patients in ID order.
    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.patients.values()
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn observation_count(&self) -> usize {
        self.patients
            .values()
            .map(|patient| patient.observations().len())
            .sum()
    }

    pub fn review(&self) -> &ReviewReport {
        &self.review
    }

    /// One row per patient.
    pub fn all_demographics(&self) -> Result<DataFrame> {
        let patients: Vec<&Patient> = self.patients.values().collect();
        let mut columns = identity_columns(patients.iter().copied());

        for field in CanonicalField::demographics() {
            columns.push(text_column(
                field.name(),
                patients
                    .iter()
                    .map(|patient| patient.demographics().get(field).map(str::to_string)),
            ));
        }
        columns.push(text_column(
            "injury_datetime",
            patients.iter().map(|patient| timestamp(patient.anchors().injury)),
        ));
        columns.push(text_column(
            "admission_datetime",
            patients.iter().map(|patient| timestamp(patient.anchors().admission)),
        ));
        columns.push(text_column(
            "surgery_datetime",
            patients.iter().map(|patient| timestamp(patient.anchors().surgery)),
        ));
        columns.push(number_column(
            "time_injury_to_surgery_hours",
            patients.iter().map(|patient| patient.injury_to_surgery_hours()),
        ));
        columns.extend(outcome_columns(patients.iter().map(|patient| patient.outcomes())));

        for value in Comorbidity::ALL {
            columns.push(flag_column(
                value.name(),
                patients.iter().map(|patient| patient.outcomes().comorbidity(value)),
            ));
        }
        for value in Complication::ALL {
            columns.push(flag_column(
                value.name(),
                patients.iter().map(|patient| patient.outcomes().complication(value)),
            ));
        }
        columns.push(flag_column(
            "UTI",
            patients.iter().map(|patient| patient.outcomes().uti),
        ));
        columns.push(text_column(
            "Pre_op_med",
            patients
                .iter()
                .map(|patient| patient.pre_op_medication().map(str::to_string)),
        ));
        columns.push(number_column(
            "total_blood_rbc",
            patients
                .iter()
                .map(|patient| Some(patient.outcomes().transfused_rbc_units)),
        ));
        columns.push(flag_column(
            "blood_rbc_yn",
            patients.iter().map(|patient| patient.outcomes().transfused()),
        ));

        DataFrame::new(columns).map_err(PipelineError::frame("demographics"))
    }

    /// One row per retained draw, with the patient's outcome flags repeated.
    pub fn all_observations(&self) -> Result<DataFrame> {
        let rows: Vec<(&Patient, &cohort_model::Observation)> = self
            .patients
            .values()
            .flat_map(|patient| {
                patient
                    .observations()
                    .iter()
                    .map(move |observation| (patient, observation))
            })
            .collect();

        let mut columns = identity_columns(rows.iter().map(|(patient, _)| *patient));
        columns.push(text_column(
            "Time",
            rows.iter().map(|(_, observation)| {
                observation.timepoint().map(|label| label.as_str().to_string())
            }),
        ));
        columns.push(number_column(
            "CAS",
            rows.iter().map(|(_, observation)| observation.cas()),
        ));
        columns.push(text_column(
            "Draw_date_lab",
            rows.iter()
                .map(|(_, observation)| timestamp(observation.draw_times().lab)),
        ));
        columns.push(text_column(
            "Draw_date_teg",
            rows.iter()
                .map(|(_, observation)| timestamp(observation.draw_times().panel)),
        ));
        columns.push(number_column(
            "time_injury_to_lab_hours",
            rows.iter()
                .map(|(_, observation)| observation.offsets().injury_to_lab),
        ));
        columns.push(number_column(
            "time_injury_to_teg_hours",
            rows.iter()
                .map(|(_, observation)| observation.offsets().injury_to_panel),
        ));
        columns.push(number_column(
            "time_surgery_to_lab_hours",
            rows.iter()
                .map(|(_, observation)| observation.offsets().surgery_to_lab),
        ));
        columns.push(number_column(
            "time_surgery_to_teg_hours",
            rows.iter()
                .map(|(_, observation)| observation.offsets().surgery_to_panel),
        ));
        columns.push(number_column(
            "time_injury_rbc_hours",
            rows.iter().map(|(_, observation)| {
                observation
                    .transfusion()
                    .and_then(|transfusion| transfusion.injury_to_transfusion_hours)
            }),
        ));
        columns.push(number_column(
            CanonicalField::TransfusionUnits.name(),
            rows.iter()
                .map(|(_, observation)| observation.transfusion().and_then(|t| t.units)),
        ));
        columns.push(text_column(
            CanonicalField::TransfusionDate.name(),
            rows.iter()
                .map(|(_, observation)| timestamp(observation.transfusion().and_then(|t| t.date))),
        ));
        columns.push(text_column(
            CanonicalField::TransfusionTimepoint.name(),
            rows.iter().map(|(_, observation)| {
                observation
                    .transfusion()
                    .and_then(|transfusion| transfusion.timepoint.clone())
            }),
        ));
        for metric in LabMetric::ALL {
            columns.push(number_column(
                metric.name(),
                rows.iter().map(|(_, observation)| observation.metric(metric)),
            ));
        }
        columns.extend(outcome_columns(
            rows.iter().map(|(patient, _)| patient.outcomes()),
        ));

        DataFrame::new(columns).map_err(PipelineError::frame("observations"))
    }
}

fn text_column(name: &str, values: impl Iterator<Item = Option<String>>) -> Column {
    Column::new(name.into(), values.collect::<Vec<_>>())
}

fn number_column(name: &str, values: impl Iterator<Item = Option<f64>>) -> Column {
    Column::new(name.into(), values.collect::<Vec<_>>())
}

fn flag_column(name: &str, values: impl Iterator<Item = bool>) -> Column {
    Column::new(name.into(), values.map(yes_no).collect::<Vec<_>>())
}

fn identity_columns<'a>(patients: impl Iterator<Item = &'a Patient> + Clone) -> Vec<Column> {
    vec![
        Column::new(
            CanonicalField::PatientId.name().into(),
            patients
                .clone()
                .map(|patient| patient.id().as_str())
                .collect::<Vec<_>>(),
        ),
        text_column(
            "Study",
            patients.map(|patient| patient.study().map(str::to_string)),
        ),
    ]
}

fn outcome_columns<'a>(outcomes: impl Iterator<Item = &'a Outcomes> + Clone) -> Vec<Column> {
    vec![
        flag_column("Death", outcomes.clone().map(|outcome| outcome.death)),
        flag_column("Withdrawn", outcomes.clone().map(|outcome| outcome.withdrawn)),
        flag_column("DVT", outcomes.clone().map(|outcome| outcome.dvt)),
        flag_column("PE", outcomes.clone().map(|outcome| outcome.pe)),
        text_column(
            "VTE_type",
            outcomes
                .clone()
                .map(|outcome| outcome.thrombosis.map(|category| category.name().to_string())),
        ),
        flag_column("VTE", outcomes.clone().map(Outcomes::has_vte)),
        text_column(
            "VTE_time",
            outcomes.map(|outcome| {
                outcome
                    .adverse_event_stage
                    .map(|stage| stage.name().to_string())
            }),
        ),
    ]
}
