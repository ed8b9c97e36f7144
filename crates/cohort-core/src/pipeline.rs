//! The batch pipeline: one export snapshot in, one [`Cohort`] out.
//!
//! Stages run in a fixed order, each consuming the previous stage's output:
//!
//! 1. synonym resolution ([`resolve_schema`])
//! 2. missing-value normalization ([`normalize_rows`]) and derived fields
//!    ([`DerivedColumns`])
//! 3. exclusions, identity resolution, enrollment filter
//! 4. per patient: timepoint canonicalization, temporal assembly, outcome
//!    aggregation, assessment scores, post-event truncation, record assembly

use tracing::{debug, info, info_span, warn};

use cohort_ingest::{ExportSource, RawTable};
use cohort_model::{
    CanonicalField, HourOffsets, LabMetric, Observation, Patient, PatientId, PatientParts,
    TimepointLabel, TimepointStage,
};
use cohort_standards::StudyConfig;

use crate::assembly::{assemble_patient, parse_metrics};
use crate::cohort::Cohort;
use crate::derive::DerivedColumns;
use crate::error::{PipelineError, Result};
use crate::identity::{apply_exclusions, resolve_identities, retain_enrolled};
use crate::normalize::{NormalizedRow, normalize_rows};
use crate::outcome::aggregate_outcomes;
use crate::review::ReviewReport;
use crate::schema::resolve_schema;
use crate::score::scores_by_stage;
use crate::temporal::TemporalAssembler;
use crate::timepoint::{TimepointIndex, promote_pre_op_to_admission};
use crate::truncation::truncate_after_event;

/// Configured pipeline, reusable across exports.
#[derive(Debug, Clone)]
pub struct CohortPipeline {
    config: StudyConfig,
    timepoints: TimepointIndex,
}

impl CohortPipeline {
    pub fn new(config: StudyConfig) -> Self {
        let timepoints = TimepointIndex::build(&config.timepoints);
        Self { config, timepoints }
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn timepoints(&self) -> &TimepointIndex {
        &self.timepoints
    }

    /// Fetch the export once and run every stage over it.
    pub fn run(&self, source: &dyn ExportSource) -> Result<Cohort> {
        let source_name = source.describe();
        let span = info_span!("cohort_pipeline", source = %source_name);
        let _guard = span.enter();

        let table = source.fetch()?;
        self.run_table(&table, &source_name)
    }

    /// Run every stage over an already-fetched table.
    pub fn run_table(&self, table: &RawTable, source_name: &str) -> Result<Cohort> {
        if table.is_empty() {
            return Err(PipelineError::EmptyExport {
                source_name: source_name.to_string(),
            });
        }

        let mut schema =
            resolve_schema(table.headers(), &self.config.synonyms, &self.config.coalesce);
        if !schema.has_field(CanonicalField::GroupKey) {
            return Err(PipelineError::MissingGroupKey {
                source_name: source_name.to_string(),
                expected: self.group_key_columns(),
            });
        }

        let derived =
            DerivedColumns::resolve(table.headers(), &self.config.joins, &self.config.treatment);
        schema.unknown.retain(|column| !derived.claims(column));

        let mut review = ReviewReport {
            unknown_columns: schema.unknown.clone(),
            shadowed_columns: schema.shadowed.clone(),
            timepoint_collisions: self.timepoints.collisions().to_vec(),
            ..ReviewReport::default()
        };

        let mut rows = normalize_rows(table, &schema, &self.config.values);
        derived.apply(table, &mut rows, &self.config.values);
        let rows = apply_exclusions(rows, &self.config.exclusions, &mut review);
        let mut patients = resolve_identities(rows, &mut review);
        if schema.has_field(CanonicalField::EnrollmentStatus) {
            patients = retain_enrolled(patients, &self.config.values, &mut review);
        }

        let temporal = TemporalAssembler::new(schema.has_field(CanonicalField::LabTime));
        let patients: Vec<Patient> = patients
            .into_iter()
            .map(|(id, rows)| self.build_patient(id, &rows, &temporal, &mut review))
            .collect();

        for (label, count) in &review.unresolved_timepoints {
            warn!(label = %label, rows = count, "unresolved timepoint label");
        }

        let cohort = Cohort::new(patients, review);
        info!(
            patients = cohort.len(),
            observations = cohort.observation_count(),
            issues = cohort.review().issue_count(),
            "cohort assembled"
        );
        Ok(cohort)
    }

    fn build_patient(
        &self,
        id: PatientId,
        rows: &[NormalizedRow],
        temporal: &TemporalAssembler,
        review: &mut ReviewReport,
    ) -> Patient {
        let span = info_span!("patient", patient = %id, rows = rows.len());
        let _guard = span.enter();

        let mut labels: Vec<Option<TimepointLabel>> = rows
            .iter()
            .map(|row| {
                row.get(CanonicalField::TimepointLabel).map(|raw| {
                    let label = self.timepoints.canonicalize(raw);
                    if let TimepointLabel::Unresolved(text) = &label {
                        review.record_unresolved_timepoint(text);
                    }
                    label
                })
            })
            .collect();
        // Scores are keyed by the recorded stage, before any promotion.
        let recorded_stages: Vec<Option<TimepointStage>> = labels
            .iter()
            .map(|label| label.as_ref().and_then(TimepointLabel::stage))
            .collect();
        let promoted = promote_pre_op_to_admission(&mut labels);
        if promoted > 0 {
            debug!(rows = promoted, "pre-op draws promoted to admission");
        }

        let anchors = temporal.anchors(&id, rows, review);
        let outcomes = aggregate_outcomes(&id, rows, &self.config, &self.timepoints, review);
        let scores = scores_by_stage(&id, rows, &self.timepoints, review);

        let mut observations = Vec::new();
        for ((row, label), stage) in rows.iter().zip(labels).zip(recorded_stages) {
            let metrics = parse_metrics(&id, row, review);
            if metrics.is_empty() {
                continue;
            }
            let has_hemoglobin = metrics.contains_key(&LabMetric::Hemoglobin);
            let draw_times = temporal.draw_times(&id, row, has_hemoglobin, review);
            let offsets = HourOffsets::between(&anchors, &draw_times);
            let cas = stage.and_then(|stage| scores.get(&stage).copied());
            let transfusion = temporal.transfusion(&id, row, &anchors, review);
            observations.push(
                Observation::new(label, draw_times, metrics, offsets)
                    .with_cas(cas)
                    .with_transfusion(transfusion),
            );
        }

        let cleared = truncate_after_event(&mut observations, outcomes.adverse_event_stage);
        if cleared > 0 {
            debug!(values = cleared, "coagulation values after adverse event cleared");
        }

        let study = self.config.study_arms.arm_for(&id).map(str::to_string);
        let pre_op_medication = self.config.medication.pre_op_for(&id).map(str::to_string);
        assemble_patient(
            rows,
            PatientParts {
                id,
                demographics: Default::default(),
                observations,
                outcomes,
                anchors,
                study,
                pre_op_medication,
            },
        )
    }

    fn group_key_columns(&self) -> String {
        self.config
            .synonyms
            .iter()
            .filter(|rule| rule.field == CanonicalField::GroupKey)
            .flat_map(|rule| rule.columns.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
