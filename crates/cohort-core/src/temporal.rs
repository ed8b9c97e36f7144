//! Draw timestamps, clinical anchors, and hour offsets.

use chrono::NaiveDateTime;
use tracing::debug;

use cohort_model::{Anchors, CanonicalField, DrawTimes, PatientId, Transfusion, hours_between};

use crate::datetime::{ParsedDate, parse_date_cell, parse_time_cell};
use crate::normalize::NormalizedRow;
use crate::review::ReviewReport;

/// Derives per-row draw timestamps and per-patient anchors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalAssembler {
    has_lab_time_column: bool,
}

impl TemporalAssembler {
    /// `has_lab_time_column` is whether the export carries a lab-time column
    /// at all, which changes how lab timestamps are derived.
    pub fn new(has_lab_time_column: bool) -> Self {
        Self {
            has_lab_time_column,
        }
    }

    /// Draw timestamps of one row.
    ///
    /// `has_hemoglobin` is whether the row carries a hemoglobin value; the
    /// lab timestamp follows it.
    pub fn draw_times(
        &self,
        patient: &PatientId,
        row: &NormalizedRow,
        has_hemoglobin: bool,
        review: &mut ReviewReport,
    ) -> DrawTimes {
        let date = draw_date(patient, row, review);
        let draw_time = time_field(patient, row, CanonicalField::DrawTime, review);
        let lab_time = time_field(patient, row, CanonicalField::LabTime, review);

        let panel = date.map(|date| date.at(draw_time.or(lab_time)));
        let lab = if self.has_lab_time_column {
            date.and_then(|date| {
                date.explicit_time()
                    .or_else(|| lab_time.map(|time| date.date().and_time(time)))
            })
        } else {
            panel
        };

        let lab = match (has_hemoglobin, lab) {
            (false, _) => None,
            (true, None) => panel,
            (true, Some(lab)) => Some(lab),
        };
        DrawTimes { panel, lab }
    }

    /// Transfusion recorded on `row`, with its offset from injury.
    ///
    /// Units are not parsed here; unparseable units are reported once by the
    /// outcome aggregation.
    pub fn transfusion(
        &self,
        patient: &PatientId,
        row: &NormalizedRow,
        anchors: &Anchors,
        review: &mut ReviewReport,
    ) -> Option<Transfusion> {
        let units = row
            .get(CanonicalField::TransfusionUnits)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|units| units.is_finite());
        let date = date_field(patient, row, CanonicalField::TransfusionDate, review)
            .map(|date| date.at(None));
        let timepoint = row
            .get(CanonicalField::TransfusionTimepoint)
            .map(str::to_string);
        let transfusion = Transfusion {
            units,
            date,
            timepoint,
            injury_to_transfusion_hours: hours_between(anchors.injury, date),
        };
        (!transfusion.is_empty()).then_some(transfusion)
    }

    /// First non-null injury, admission, and surgery timestamps.
    pub fn anchors(
        &self,
        patient: &PatientId,
        rows: &[NormalizedRow],
        review: &mut ReviewReport,
    ) -> Anchors {
        let anchors = Anchors {
            injury: first_anchor(
                patient,
                rows,
                CanonicalField::InjuryDate,
                Some(CanonicalField::InjuryTime),
                review,
            ),
            admission: first_anchor(patient, rows, CanonicalField::AdmissionDate, None, review),
            surgery: first_anchor(
                patient,
                rows,
                CanonicalField::SurgeryDate,
                Some(CanonicalField::SurgeryTime),
                review,
            ),
        };
        debug!(
            patient = %patient,
            injury = anchors.injury.is_some(),
            admission = anchors.admission.is_some(),
            surgery = anchors.surgery.is_some(),
            "anchors resolved"
        );
        anchors
    }
}

fn draw_date(
    patient: &PatientId,
    row: &NormalizedRow,
    review: &mut ReviewReport,
) -> Option<ParsedDate> {
    date_field(patient, row, CanonicalField::DrawDate, review)
        .or_else(|| date_field(patient, row, CanonicalField::VisitDate, review))
}

fn date_field(
    patient: &PatientId,
    row: &NormalizedRow,
    field: CanonicalField,
    review: &mut ReviewReport,
) -> Option<ParsedDate> {
    let raw = row.get(field)?;
    let parsed = parse_date_cell(raw);
    if parsed.is_none() {
        review.record_unparseable(patient, field, raw);
    }
    parsed
}

fn time_field(
    patient: &PatientId,
    row: &NormalizedRow,
    field: CanonicalField,
    review: &mut ReviewReport,
) -> Option<chrono::NaiveTime> {
    let raw = row.get(field)?;
    let parsed = parse_time_cell(raw);
    if parsed.is_none() {
        review.record_unparseable(patient, field, raw);
    }
    parsed
}

fn first_anchor(
    patient: &PatientId,
    rows: &[NormalizedRow],
    date: CanonicalField,
    time: Option<CanonicalField>,
    review: &mut ReviewReport,
) -> Option<NaiveDateTime> {
    rows.iter().find_map(|row| {
        let parsed = date_field(patient, row, date, review)?;
        let time = time.and_then(|field| time_field(patient, row, field, review));
        Some(parsed.at(time))
    })
}
