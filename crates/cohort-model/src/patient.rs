//! Assembled patient timelines.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ModelError;
use crate::field::{CanonicalField, LabMetric, Panel};
use crate::outcome::Outcomes;
use crate::timepoint::TimepointLabel;

/// Normalized study identifier: trimmed and upper-cased, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(raw: &str) -> Result<Self, ModelError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ModelError::InvalidPatientId(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(&prefix.trim().to_uppercase())
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PatientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Fractional hours from `from` to `to`; null when either side is null.
pub fn hours_between(from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> Option<f64> {
    let (from, to) = (from?, to?);
    Some((to - from).num_seconds() as f64 / 3600.0)
}

/// Clinical anchor events of one patient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Anchors {
    pub injury: Option<NaiveDateTime>,
    pub admission: Option<NaiveDateTime>,
    pub surgery: Option<NaiveDateTime>,
}

impl Anchors {
    pub fn injury_to_surgery_hours(&self) -> Option<f64> {
        hours_between(self.injury, self.surgery)
    }
}

/// Draw timestamps of one row, one per analyser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrawTimes {
    /// Coagulation-panel draw.
    pub panel: Option<NaiveDateTime>,
    /// Lab-panel draw.
    pub lab: Option<NaiveDateTime>,
}

/// Hour offsets between anchors and draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HourOffsets {
    pub injury_to_lab: Option<f64>,
    pub injury_to_panel: Option<f64>,
    pub surgery_to_lab: Option<f64>,
    pub surgery_to_panel: Option<f64>,
}

impl HourOffsets {
    pub fn between(anchors: &Anchors, draws: &DrawTimes) -> Self {
        Self {
            injury_to_lab: hours_between(anchors.injury, draws.lab),
            injury_to_panel: hours_between(anchors.injury, draws.panel),
            surgery_to_lab: hours_between(anchors.surgery, draws.lab),
            surgery_to_panel: hours_between(anchors.surgery, draws.panel),
        }
    }
}

/// Red-cell transfusion recorded on the same export row as a draw.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transfusion {
    pub units: Option<f64>,
    pub date: Option<NaiveDateTime>,
    /// Timepoint text as recorded; not canonicalized.
    pub timepoint: Option<String>,
    pub injury_to_transfusion_hours: Option<f64>,
}

impl Transfusion {
    pub fn is_empty(&self) -> bool {
        self.units.is_none() && self.date.is_none() && self.timepoint.is_none()
    }
}

/// One retained blood draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    timepoint: Option<TimepointLabel>,
    draw_times: DrawTimes,
    metrics: BTreeMap<LabMetric, f64>,
    offsets: HourOffsets,
    cas: Option<f64>,
    transfusion: Option<Transfusion>,
}

impl Observation {
    pub fn new(
        timepoint: Option<TimepointLabel>,
        draw_times: DrawTimes,
        metrics: BTreeMap<LabMetric, f64>,
        offsets: HourOffsets,
    ) -> Self {
        Self {
            timepoint,
            draw_times,
            metrics,
            offsets,
            cas: None,
            transfusion: None,
        }
    }

    /// Attach the assessment score taken at this draw's timepoint.
    pub fn with_cas(mut self, cas: Option<f64>) -> Self {
        self.cas = cas;
        self
    }

    pub fn with_transfusion(mut self, transfusion: Option<Transfusion>) -> Self {
        self.transfusion = transfusion.filter(|transfusion| !transfusion.is_empty());
        self
    }

    pub fn timepoint(&self) -> Option<&TimepointLabel> {
        self.timepoint.as_ref()
    }

    pub fn draw_times(&self) -> &DrawTimes {
        &self.draw_times
    }

    pub fn offsets(&self) -> &HourOffsets {
        &self.offsets
    }

    pub fn cas(&self) -> Option<f64> {
        self.cas
    }

    pub fn transfusion(&self) -> Option<&Transfusion> {
        self.transfusion.as_ref()
    }

    pub fn metric(&self, metric: LabMetric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }

    pub fn metrics(&self) -> impl Iterator<Item = (LabMetric, f64)> + '_ {
        self.metrics.iter().map(|(metric, value)| (*metric, *value))
    }

    pub fn has_any_metric(&self) -> bool {
        !self.metrics.is_empty()
    }

    /// Null every metric of `panel`, returning how many values were cleared.
    pub fn clear_panel(&mut self, panel: Panel) -> usize {
        let before = self.metrics.len();
        self.metrics.retain(|metric, _| metric.panel() != panel);
        before - self.metrics.len()
    }
}

/// First non-null value per demographic field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Demographics(BTreeMap<CanonicalField, String>);

impl Demographics {
    pub fn new(values: BTreeMap<CanonicalField, String>) -> Self {
        Self(values)
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.0.iter().map(|(field, value)| (*field, value.as_str()))
    }
}

/// Everything needed to build a [`Patient`].
#[derive(Debug, Clone)]
pub struct PatientParts {
    pub id: PatientId,
    pub demographics: Demographics,
    pub observations: Vec<Observation>,
    pub outcomes: Outcomes,
    pub anchors: Anchors,
    pub study: Option<String>,
    pub pre_op_medication: Option<String>,
}

/// Immutable per-patient timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patient {
    id: PatientId,
    study: Option<String>,
    demographics: Demographics,
    anchors: Anchors,
    injury_to_surgery_hours: Option<f64>,
    outcomes: Outcomes,
    pre_op_medication: Option<String>,
    observations: Vec<Observation>,
}

impl Patient {
    pub fn from_parts(parts: PatientParts) -> Self {
        let injury_to_surgery_hours = parts.anchors.injury_to_surgery_hours();
        Self {
            id: parts.id,
            study: parts.study,
            demographics: parts.demographics,
            anchors: parts.anchors,
            injury_to_surgery_hours,
            outcomes: parts.outcomes,
            pre_op_medication: parts.pre_op_medication,
            observations: parts.observations,
        }
    }

    pub fn id(&self) -> &PatientId {
        &self.id
    }

    pub fn study(&self) -> Option<&str> {
        self.study.as_deref()
    }

    pub fn demographics(&self) -> &Demographics {
        &self.demographics
    }

    pub fn anchors(&self) -> &Anchors {
        &self.anchors
    }

    pub fn injury_to_surgery_hours(&self) -> Option<f64> {
        self.injury_to_surgery_hours
    }

    pub fn outcomes(&self) -> &Outcomes {
        &self.outcomes
    }

    pub fn pre_op_medication(&self) -> Option<&str> {
        self.pre_op_medication.as_deref()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}
