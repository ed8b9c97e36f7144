//! Canonical field vocabulary.
//!
//! Every raw export column is resolved to at most one [`CanonicalField`].
//! Names round-trip through [`FromStr`] and [`fmt::Display`] so that
//! configuration files can refer to fields by their canonical spelling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Which analyser produced a lab metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Panel {
    /// Routine chemistry and haematology (hemoglobin, creatinine).
    Lab,
    /// Viscoelastic coagulation and platelet mapping assays.
    Coagulation,
}

/// Numeric lab and coagulation measurements captured per blood draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum LabMetric {
    Hemoglobin,
    Creatinine,
    RTime,
    KTime,
    AlphaAngle,
    Ma,
    Ly30,
    Act,
    AdpAggregation,
    AdpInhibition,
    AdpMa,
    AaAggregation,
    AaInhibition,
    AaMa,
    CffMa,
    ActfMa,
    CffFlev,
    CffA10,
}

impl LabMetric {
    pub const ALL: [LabMetric; 18] = [
        LabMetric::Hemoglobin,
        LabMetric::Creatinine,
        LabMetric::RTime,
        LabMetric::KTime,
        LabMetric::AlphaAngle,
        LabMetric::Ma,
        LabMetric::Ly30,
        LabMetric::Act,
        LabMetric::AdpAggregation,
        LabMetric::AdpInhibition,
        LabMetric::AdpMa,
        LabMetric::AaAggregation,
        LabMetric::AaInhibition,
        LabMetric::AaMa,
        LabMetric::CffMa,
        LabMetric::ActfMa,
        LabMetric::CffFlev,
        LabMetric::CffA10,
    ];

    /// Canonical column name.
    pub fn name(&self) -> &'static str {
        match self {
            LabMetric::Hemoglobin => "Hemoglobin",
            LabMetric::Creatinine => "Creatinine",
            LabMetric::RTime => "R_time",
            LabMetric::KTime => "K_time",
            LabMetric::AlphaAngle => "Alpha_Angle",
            LabMetric::Ma => "MA",
            LabMetric::Ly30 => "LY30",
            LabMetric::Act => "ACT",
            LabMetric::AdpAggregation => "ADP-agg",
            LabMetric::AdpInhibition => "ADP-inh",
            LabMetric::AdpMa => "ADP-ma",
            LabMetric::AaAggregation => "AA-agg",
            LabMetric::AaInhibition => "AA-inh",
            LabMetric::AaMa => "AA-ma",
            LabMetric::CffMa => "CFF-MA",
            LabMetric::ActfMa => "ACTF-MA",
            LabMetric::CffFlev => "CFF-FLEV",
            LabMetric::CffA10 => "CFF-A10",
        }
    }

    pub fn panel(&self) -> Panel {
        match self {
            LabMetric::Hemoglobin | LabMetric::Creatinine => Panel::Lab,
            _ => Panel::Coagulation,
        }
    }

    /// Metrics belonging to one panel, in canonical order.
    pub fn in_panel(panel: Panel) -> impl Iterator<Item = LabMetric> {
        Self::ALL.into_iter().filter(move |metric| metric.panel() == panel)
    }
}

impl From<LabMetric> for &'static str {
    fn from(metric: LabMetric) -> Self {
        metric.name()
    }
}

/// Thrombosis indicator recorded on outcome forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum ThrombosisKind {
    /// Deep vein thrombosis.
    Dvt,
    /// Pulmonary embolism.
    Pe,
}

impl ThrombosisKind {
    pub const ALL: [ThrombosisKind; 2] = [ThrombosisKind::Dvt, ThrombosisKind::Pe];

    pub fn name(&self) -> &'static str {
        match self {
            ThrombosisKind::Dvt => "DVT",
            ThrombosisKind::Pe => "PE",
        }
    }
}

impl From<ThrombosisKind> for &'static str {
    fn from(kind: ThrombosisKind) -> Self {
        kind.name()
    }
}

/// Baseline comorbidity checkboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum Comorbidity {
    Diabetes,
    Cancer,
    Cardiovascular,
    Pulmonary,
    Stroke,
    CurrentSmoker,
}

impl Comorbidity {
    pub const ALL: [Comorbidity; 6] = [
        Comorbidity::Diabetes,
        Comorbidity::Cancer,
        Comorbidity::Cardiovascular,
        Comorbidity::Pulmonary,
        Comorbidity::Stroke,
        Comorbidity::CurrentSmoker,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Comorbidity::Diabetes => "comorb_diabetes",
            Comorbidity::Cancer => "comorb_cancer",
            Comorbidity::Cardiovascular => "comorb_cardiovascular",
            Comorbidity::Pulmonary => "comorb_pulmonary",
            Comorbidity::Stroke => "comorb_stroke",
            Comorbidity::CurrentSmoker => "comorb_current_smoker",
        }
    }
}

impl From<Comorbidity> for &'static str {
    fn from(value: Comorbidity) -> Self {
        value.name()
    }
}

/// In-hospital complication checkboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum Complication {
    Pulmonary,
    Cardiovascular,
    Infection,
}

impl Complication {
    pub const ALL: [Complication; 3] = [
        Complication::Pulmonary,
        Complication::Cardiovascular,
        Complication::Infection,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Complication::Pulmonary => "comp_pulmonary",
            Complication::Cardiovascular => "comp_cardiovascular",
            Complication::Infection => "comp_infection",
        }
    }
}

impl From<Complication> for &'static str {
    fn from(value: Complication) -> Self {
        value.name()
    }
}

/// The closed output vocabulary every raw column is normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CanonicalField {
    PatientId,
    /// Record key shared by every row of one longitudinal subject entry.
    GroupKey,
    EnrollmentStatus,
    Age,
    Sex,
    Bmi,
    AoOta,
    /// Operative treatment, free text or derived from procedure checkboxes.
    Treatment,
    InjuryDate,
    InjuryTime,
    AdmissionDate,
    SurgeryDate,
    SurgeryTime,
    /// Primary draw date; may already carry a time of day.
    DrawDate,
    /// Visit date used when the draw date was not captured.
    VisitDate,
    /// Time of the coagulation-panel draw.
    DrawTime,
    /// Time of the lab-panel draw.
    LabTime,
    TimepointLabel,
    Metric(LabMetric),
    Thrombosis(ThrombosisKind),
    /// Death recorded as an outcome/complication checkbox.
    DeathFlag,
    /// Free-text withdrawal reason (or withdrawal date).
    WithdrawalReason,
    Comorbidity(Comorbidity),
    Complication(Complication),
    /// Packed red blood cell units transfused, recorded per row.
    TransfusionUnits,
    /// Date (and possibly time) of the transfusion on the same row.
    TransfusionDate,
    /// Free-text timepoint of the transfusion, carried through as recorded.
    TransfusionTimepoint,
    /// Clinical assessment score.
    CasScore,
    /// Timepoint label the assessment score was taken at.
    CasTimepoint,
    /// Stage at which the adverse thrombotic event was recorded.
    AdverseEventStage,
}

impl CanonicalField {
    const SCALARS: [CanonicalField; 26] = [
        CanonicalField::PatientId,
        CanonicalField::GroupKey,
        CanonicalField::EnrollmentStatus,
        CanonicalField::Age,
        CanonicalField::Sex,
        CanonicalField::Bmi,
        CanonicalField::AoOta,
        CanonicalField::Treatment,
        CanonicalField::InjuryDate,
        CanonicalField::InjuryTime,
        CanonicalField::AdmissionDate,
        CanonicalField::SurgeryDate,
        CanonicalField::SurgeryTime,
        CanonicalField::DrawDate,
        CanonicalField::VisitDate,
        CanonicalField::DrawTime,
        CanonicalField::LabTime,
        CanonicalField::TimepointLabel,
        CanonicalField::DeathFlag,
        CanonicalField::WithdrawalReason,
        CanonicalField::TransfusionUnits,
        CanonicalField::TransfusionDate,
        CanonicalField::TransfusionTimepoint,
        CanonicalField::CasScore,
        CanonicalField::CasTimepoint,
        CanonicalField::AdverseEventStage,
    ];

    /// Every canonical field, scalars first then the enumerated families.
    pub fn all() -> Vec<CanonicalField> {
        let mut fields = Self::SCALARS.to_vec();
        fields.extend(LabMetric::ALL.into_iter().map(CanonicalField::Metric));
        fields.extend(ThrombosisKind::ALL.into_iter().map(CanonicalField::Thrombosis));
        fields.extend(Comorbidity::ALL.into_iter().map(CanonicalField::Comorbidity));
        fields.extend(Complication::ALL.into_iter().map(CanonicalField::Complication));
        fields
    }

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::PatientId => "PatientID",
            CanonicalField::GroupKey => "GroupKey",
            CanonicalField::EnrollmentStatus => "EnrollmentStatus",
            CanonicalField::Age => "Age",
            CanonicalField::Sex => "Sex",
            CanonicalField::Bmi => "BMI",
            CanonicalField::AoOta => "AO_OTA",
            CanonicalField::Treatment => "Treatment",
            CanonicalField::InjuryDate => "InjuryDate",
            CanonicalField::InjuryTime => "InjuryTime",
            CanonicalField::AdmissionDate => "AdmissionDate",
            CanonicalField::SurgeryDate => "SurgeryDate",
            CanonicalField::SurgeryTime => "SurgeryTime",
            CanonicalField::DrawDate => "DrawDate",
            CanonicalField::VisitDate => "VisitDate",
            CanonicalField::DrawTime => "DrawTime",
            CanonicalField::LabTime => "LabTime",
            CanonicalField::TimepointLabel => "TimepointLabel",
            CanonicalField::Metric(metric) => metric.name(),
            CanonicalField::Thrombosis(kind) => kind.name(),
            CanonicalField::DeathFlag => "Death",
            CanonicalField::WithdrawalReason => "Withdrawn",
            CanonicalField::Comorbidity(value) => value.name(),
            CanonicalField::Complication(value) => value.name(),
            CanonicalField::TransfusionUnits => "blood_rbc",
            CanonicalField::TransfusionDate => "blood_date",
            CanonicalField::TransfusionTimepoint => "rbc_timepoint",
            CanonicalField::CasScore => "CAS",
            CanonicalField::CasTimepoint => "cas_timepoint",
            CanonicalField::AdverseEventStage => "VTE_time",
        }
    }

    /// Fields carried in the per-patient demographic snapshot.
    pub fn is_demographic(&self) -> bool {
        matches!(
            self,
            CanonicalField::Age
                | CanonicalField::Sex
                | CanonicalField::Bmi
                | CanonicalField::AoOta
                | CanonicalField::Treatment
                | CanonicalField::InjuryDate
                | CanonicalField::InjuryTime
                | CanonicalField::AdmissionDate
                | CanonicalField::SurgeryDate
                | CanonicalField::SurgeryTime
        )
    }

    /// Demographic fields in output order.
    pub fn demographics() -> Vec<CanonicalField> {
        Self::SCALARS
            .into_iter()
            .filter(CanonicalField::is_demographic)
            .collect()
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CanonicalField {
    type Err = ModelError;

    /// Parse a canonical name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CanonicalField::all()
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ModelError::UnknownField(trimmed.to_string()))
    }
}

impl TryFrom<String> for CanonicalField {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CanonicalField> for String {
    fn from(field: CanonicalField) -> Self {
        field.name().to_string()
    }
}
