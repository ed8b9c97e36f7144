#![deny(unsafe_code)]

//! On-disk layout of a study configuration file.
//!
//! These types mirror the TOML document one-to-one. Names are kept as plain
//! strings here and validated when converted into a
//! [`StudyConfig`](crate::StudyConfig).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfigFile {
    pub config: ConfigHeader,
    pub values: ValueSets,
    pub synonyms: Vec<FieldColumns>,
    #[serde(default)]
    pub coalesce: Vec<FieldColumns>,
    #[serde(default)]
    pub joins: Vec<JoinFile>,
    #[serde(default)]
    pub treatment: TreatmentFile,
    #[serde(default)]
    pub exclusions: ExclusionsFile,
    #[serde(default)]
    pub study_arms: Vec<StudyArmFile>,
    #[serde(default)]
    pub thrombosis_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub adverse_events: BTreeMap<String, String>,
    #[serde(default)]
    pub medication: MedicationFile,
    #[serde(default)]
    pub complications: ComplicationsFile,
    pub timepoints: Vec<TimepointVariants>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigHeader {
    pub schema: String,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSets {
    #[serde(default)]
    pub missing: Vec<String>,
    #[serde(default)]
    pub truthy: Vec<String>,
    #[serde(default)]
    pub death_terms: Vec<String>,
    #[serde(default)]
    pub enrolled: Vec<String>,
}

/// A canonical field name with an ordered list of raw column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldColumns {
    pub field: String,
    pub columns: Vec<String>,
}

/// Columns whose non-empty values are joined into one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinFile {
    pub field: String,
    pub columns: Vec<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreatmentFile {
    /// Values that mark a checkbox as ticked. Empty means the built-in set.
    #[serde(default)]
    pub checked: Vec<String>,
    #[serde(default)]
    pub groups: Vec<TreatmentGroupFile>,
    #[serde(default)]
    pub classes: Vec<TreatmentClassFile>,
}

/// A checkbox group: columns named `<prefix>___<code>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentGroupFile {
    pub prefix: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentClassFile {
    pub class: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionsFile {
    #[serde(default)]
    pub patients: BTreeMap<String, String>,
    #[serde(default)]
    pub prefixes: Vec<PrefixReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixReason {
    pub prefix: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyArmFile {
    pub prefix: String,
    pub arm: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicationFile {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub no_default_prefixes: Vec<String>,
    #[serde(default)]
    pub groups: Vec<MedicationGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationGroup {
    pub medication: String,
    pub patients: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplicationsFile {
    #[serde(default)]
    pub uti: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimepointVariants {
    pub stage: String,
    pub variants: Vec<String>,
}
