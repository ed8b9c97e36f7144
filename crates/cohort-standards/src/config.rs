#![deny(unsafe_code)]

//! Validated study configuration.

use std::collections::{BTreeMap, BTreeSet};

use cohort_model::{CanonicalField, PatientId, ThrombosisCategory, TimepointStage};

use crate::error::{ConfigError, Result};
use crate::file::{FieldColumns, StudyConfigFile, TreatmentFile};

pub const CONFIG_SCHEMA: &str = "cohort-study";
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Raw columns that resolve to one canonical field, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymRule {
    pub field: CanonicalField,
    pub columns: Vec<String>,
}

/// Raw columns that fill a canonical field left empty by synonym resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalesceRule {
    pub field: CanonicalField,
    pub columns: Vec<String>,
}

/// Raw columns whose non-empty values are joined into one canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRule {
    pub field: CanonicalField,
    pub columns: Vec<String>,
    pub separator: String,
}

/// Checkbox values that count as ticked when a study declares none.
pub const DEFAULT_CHECKED_VALUES: [&str; 3] = ["checked", "1", "true"];

/// One procedure checkbox group. Columns are named `<prefix>___<code>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreatmentGroup {
    pub prefix: String,
    /// Checkbox code to procedure label.
    pub options: BTreeMap<String, String>,
}

impl TreatmentGroup {
    /// Procedure label of `column`, if the column belongs to this group.
    pub fn label_for(&self, column: &str) -> Option<&str> {
        let code = column.trim().strip_prefix(&self.prefix)?.strip_prefix("___")?;
        self.options.get(code).map(String::as_str)
    }
}

/// Treatment derivation from procedure checkboxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreatmentRules {
    /// Lower-cased ticked values.
    pub checked: BTreeSet<String>,
    /// Groups in priority order; the first group with a ticked box wins.
    pub groups: Vec<TreatmentGroup>,
    /// Lower-cased procedure description to treatment class.
    pub classes: BTreeMap<String, String>,
}

impl TreatmentRules {
    pub fn is_checked(&self, value: &str) -> bool {
        self.checked.contains(&value.trim().to_lowercase())
    }

    /// Treatment class of a procedure description. Unmapped descriptions are
    /// returned unchanged.
    pub fn classify<'a>(&'a self, procedure: &'a str) -> &'a str {
        self.classes
            .get(&procedure.trim().to_lowercase())
            .map_or(procedure, String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.classes.is_empty()
    }
}

/// Value vocabularies shared by the normalization stages.
///
/// `truthy`, `death_terms` are stored lower-cased; `missing` and `enrolled`
/// are compared exactly after trimming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueVocabulary {
    pub missing: BTreeSet<String>,
    pub truthy: BTreeSet<String>,
    pub death_terms: BTreeSet<String>,
    pub enrolled: BTreeSet<String>,
}

impl ValueVocabulary {
    pub fn is_missing(&self, value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty() || self.missing.contains(trimmed)
    }

    pub fn is_truthy(&self, value: &str) -> bool {
        self.truthy.contains(&value.trim().to_lowercase())
    }

    pub fn is_death_term(&self, value: &str) -> bool {
        self.death_terms.contains(&value.trim().to_lowercase())
    }

    pub fn is_enrolled(&self, value: &str) -> bool {
        self.enrolled.contains(value.trim())
    }
}

/// Stage to known free-text variants, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimepointDictionary {
    entries: Vec<(TimepointStage, Vec<String>)>,
}

impl TimepointDictionary {
    pub fn new(entries: Vec<(TimepointStage, Vec<String>)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(TimepointStage, Vec<String>)] {
        &self.entries
    }

    pub fn variants(&self, stage: TimepointStage) -> &[String] {
        self.entries
            .iter()
            .find(|(declared, _)| *declared == stage)
            .map(|(_, variants)| variants.as_slice())
            .unwrap_or_default()
    }

    /// Register an extra variant for `stage`, declaring the stage if needed.
    pub fn add_variant(&mut self, stage: TimepointStage, variant: impl Into<String>) {
        let variant = variant.into();
        match self.entries.iter_mut().find(|(declared, _)| *declared == stage) {
            Some((_, variants)) => variants.push(variant),
            None => self.entries.push((stage, vec![variant])),
        }
    }
}

/// Patients removed from the batch before identity resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    pub patients: BTreeMap<PatientId, String>,
    pub prefixes: Vec<(String, String)>,
}

impl ExclusionList {
    /// Reason `id` is excluded, if it is.
    pub fn reason_for(&self, id: &PatientId) -> Option<&str> {
        if let Some(reason) = self.patients.get(id) {
            return Some(reason);
        }
        self.prefixes
            .iter()
            .find(|(prefix, _)| id.starts_with(prefix))
            .map(|(_, reason)| reason.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty() && self.prefixes.is_empty()
    }
}

/// Study arm assignment by ID prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyArms {
    /// Sorted longest prefix first.
    prefixes: Vec<(String, String)>,
}

impl StudyArms {
    pub fn new(mut prefixes: Vec<(String, String)>) -> Self {
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { prefixes }
    }

    pub fn arm_for(&self, id: &PatientId) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(prefix, _)| id.starts_with(prefix))
            .map(|(_, arm)| arm.as_str())
    }
}

/// Pre-operative anticoagulation assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicationTable {
    pub default: Option<String>,
    pub no_default_prefixes: Vec<String>,
    pub assigned: BTreeMap<PatientId, String>,
}

impl MedicationTable {
    pub fn pre_op_for(&self, id: &PatientId) -> Option<&str> {
        if let Some(medication) = self.assigned.get(id) {
            return Some(medication);
        }
        if self
            .no_default_prefixes
            .iter()
            .any(|prefix| id.starts_with(prefix))
        {
            return None;
        }
        self.default.as_deref()
    }
}

/// Complete, validated configuration for one study export.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyConfig {
    pub synonyms: Vec<SynonymRule>,
    pub coalesce: Vec<CoalesceRule>,
    pub joins: Vec<JoinRule>,
    pub treatment: TreatmentRules,
    pub values: ValueVocabulary,
    pub timepoints: TimepointDictionary,
    pub exclusions: ExclusionList,
    pub study_arms: StudyArms,
    pub thrombosis_overrides: BTreeMap<PatientId, ThrombosisCategory>,
    pub adverse_events: BTreeMap<PatientId, TimepointStage>,
    pub medication: MedicationTable,
    pub uti_patients: BTreeSet<PatientId>,
}

impl StudyConfig {
    /// Overlay an extra timepoint variant on top of the loaded dictionary.
    pub fn with_timepoint_variant(mut self, stage: TimepointStage, variant: &str) -> Self {
        self.timepoints.add_variant(stage, variant);
        self
    }

    pub fn with_exclusion(mut self, id: PatientId, reason: &str) -> Self {
        self.exclusions.patients.insert(id, reason.to_string());
        self
    }

    pub fn with_adverse_event(mut self, id: PatientId, stage: TimepointStage) -> Self {
        self.adverse_events.insert(id, stage);
        self
    }
}

impl TryFrom<StudyConfigFile> for StudyConfig {
    type Error = ConfigError;

    fn try_from(file: StudyConfigFile) -> Result<Self> {
        if file.config.schema != CONFIG_SCHEMA || file.config.schema_version != CONFIG_SCHEMA_VERSION
        {
            return Err(ConfigError::UnsupportedSchema {
                schema: file.config.schema,
                version: file.config.schema_version,
            });
        }
        if file.synonyms.is_empty() {
            return Err(ConfigError::invalid("at least one synonym rule is required"));
        }

        let synonyms = file
            .synonyms
            .iter()
            .map(|rule| {
                let (field, columns) = field_columns("synonyms", rule)?;
                Ok(SynonymRule { field, columns })
            })
            .collect::<Result<Vec<_>>>()?;
        let coalesce = file
            .coalesce
            .iter()
            .map(|rule| {
                let (field, columns) = field_columns("coalesce", rule)?;
                Ok(CoalesceRule { field, columns })
            })
            .collect::<Result<Vec<_>>>()?;

        let joins = file
            .joins
            .iter()
            .map(|rule| {
                let (field, columns) = field_columns(
                    "joins",
                    &FieldColumns {
                        field: rule.field.clone(),
                        columns: rule.columns.clone(),
                    },
                )?;
                Ok(JoinRule {
                    field,
                    columns,
                    separator: rule.separator.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let treatment = treatment_rules(&file.treatment)?;

        let values = ValueVocabulary {
            missing: trimmed_set(&file.values.missing),
            truthy: lowered_set(&file.values.truthy),
            death_terms: lowered_set(&file.values.death_terms),
            enrolled: trimmed_set(&file.values.enrolled),
        };

        let mut seen_stages = BTreeSet::new();
        let mut entries = Vec::with_capacity(file.timepoints.len());
        for entry in &file.timepoints {
            let stage = parse_stage("timepoints", &entry.stage)?;
            if !seen_stages.insert(stage) {
                return Err(ConfigError::invalid(format!(
                    "timepoint stage {stage} declared more than once"
                )));
            }
            entries.push((stage, entry.variants.clone()));
        }

        let mut exclusions = ExclusionList::default();
        for (id, reason) in &file.exclusions.patients {
            exclusions
                .patients
                .insert(parse_id("exclusions.patients", id)?, reason.clone());
        }
        for rule in &file.exclusions.prefixes {
            let prefix = rule.prefix.trim().to_uppercase();
            if prefix.is_empty() {
                return Err(ConfigError::invalid("empty exclusion prefix"));
            }
            exclusions.prefixes.push((prefix, rule.reason.clone()));
        }

        let study_arms = StudyArms::new(
            file.study_arms
                .iter()
                .map(|arm| (arm.prefix.trim().to_uppercase(), arm.arm.clone()))
                .collect(),
        );

        let mut thrombosis_overrides = BTreeMap::new();
        for (id, category) in &file.thrombosis_overrides {
            let category = ThrombosisCategory::parse(category).ok_or_else(|| {
                ConfigError::invalid(format!("unknown thrombosis category {category:?}"))
            })?;
            thrombosis_overrides.insert(parse_id("thrombosis_overrides", id)?, category);
        }

        let mut adverse_events = BTreeMap::new();
        for (id, stage) in &file.adverse_events {
            adverse_events.insert(
                parse_id("adverse_events", id)?,
                parse_stage("adverse_events", stage)?,
            );
        }

        let mut medication = MedicationTable {
            default: file.medication.default.clone(),
            no_default_prefixes: file
                .medication
                .no_default_prefixes
                .iter()
                .map(|prefix| prefix.trim().to_uppercase())
                .collect(),
            assigned: BTreeMap::new(),
        };
        // Later groups override earlier ones.
        for group in &file.medication.groups {
            for id in &group.patients {
                medication
                    .assigned
                    .insert(parse_id("medication.groups", id)?, group.medication.clone());
            }
        }

        let uti_patients = file
            .complications
            .uti
            .iter()
            .map(|id| parse_id("complications.uti", id))
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(Self {
            synonyms,
            coalesce,
            joins,
            treatment,
            values,
            timepoints: TimepointDictionary::new(entries),
            exclusions,
            study_arms,
            thrombosis_overrides,
            adverse_events,
            medication,
            uti_patients,
        })
    }
}

fn field_columns(section: &str, rule: &FieldColumns) -> Result<(CanonicalField, Vec<String>)> {
    let field = rule
        .field
        .parse::<CanonicalField>()
        .map_err(|_| ConfigError::UnknownField {
            section: section.to_string(),
            name: rule.field.clone(),
        })?;
    let columns: Vec<String> = rule
        .columns
        .iter()
        .map(|column| column.trim().to_string())
        .filter(|column| !column.is_empty())
        .collect();
    if columns.is_empty() {
        return Err(ConfigError::invalid(format!(
            "{section} rule for {field} lists no columns"
        )));
    }
    Ok((field, columns))
}

fn treatment_rules(file: &TreatmentFile) -> Result<TreatmentRules> {
    let checked = if file.checked.is_empty() {
        DEFAULT_CHECKED_VALUES.iter().map(ToString::to_string).collect()
    } else {
        lowered_set(&file.checked)
    };

    let mut groups = Vec::with_capacity(file.groups.len());
    for group in &file.groups {
        let prefix = group.prefix.trim().to_string();
        if prefix.is_empty() {
            return Err(ConfigError::invalid("empty treatment group prefix"));
        }
        let options = group
            .options
            .iter()
            .map(|(code, label)| (code.trim().to_string(), label.trim().to_string()))
            .collect();
        groups.push(TreatmentGroup { prefix, options });
    }

    let mut classes = BTreeMap::new();
    for class in &file.classes {
        for label in &class.labels {
            let key = label.trim().to_lowercase();
            match classes.insert(key, class.class.clone()) {
                Some(previous) if previous != class.class => {
                    return Err(ConfigError::invalid(format!(
                        "treatment {label:?} classified as both {previous} and {}",
                        class.class
                    )));
                }
                _ => {}
            }
        }
    }

    Ok(TreatmentRules {
        checked,
        groups,
        classes,
    })
}

fn parse_stage(section: &str, name: &str) -> Result<TimepointStage> {
    name.parse().map_err(|_| ConfigError::UnknownStage {
        section: section.to_string(),
        name: name.to_string(),
    })
}

fn parse_id(section: &str, id: &str) -> Result<PatientId> {
    PatientId::new(id).map_err(|_| ConfigError::InvalidPatientId {
        section: section.to_string(),
        id: id.to_string(),
    })
}

fn trimmed_set(values: &[String]) -> BTreeSet<String> {
    values.iter().map(|value| value.trim().to_string()).collect()
}

fn lowered_set(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|value| value.trim().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> PatientId {
        PatientId::new(raw).unwrap()
    }

    #[test]
    fn longest_study_arm_prefix_wins() {
        let arms = StudyArms::new(vec![
            ("TH".to_string(), "Hip".to_string()),
            ("THB-".to_string(), "Pathway".to_string()),
        ]);
        assert_eq!(arms.arm_for(&id("THB-HPA-007")), Some("Pathway"));
        assert_eq!(arms.arm_for(&id("TH-001")), Some("Hip"));
        assert_eq!(arms.arm_for(&id("XX-001")), None);
    }

    #[test]
    fn medication_default_skips_no_default_prefixes() {
        let table = MedicationTable {
            default: Some("LMWH".to_string()),
            no_default_prefixes: vec!["TA-".to_string()],
            assigned: BTreeMap::from([(id("TA-002"), "ASA".to_string())]),
        };
        assert_eq!(table.pre_op_for(&id("TA-002")), Some("ASA"));
        assert_eq!(table.pre_op_for(&id("TA-003")), None);
        assert_eq!(table.pre_op_for(&id("TF-001")), Some("LMWH"));
    }

    #[test]
    fn exclusion_prefix_matches_case_insensitively() {
        let list = ExclusionList {
            patients: BTreeMap::new(),
            prefixes: vec![("TPANO".to_string(), "Non-operative".to_string())],
        };
        assert_eq!(list.reason_for(&id("tpano-004")), Some("Non-operative"));
        assert_eq!(list.reason_for(&id("TPA-004")), None);
    }

    #[test]
    fn vocabulary_comparisons() {
        let values = ValueVocabulary {
            missing: trimmed_set(&["-999".to_string()]),
            truthy: lowered_set(&["Yes".to_string(), "Checked".to_string()]),
            death_terms: lowered_set(&["death".to_string()]),
            enrolled: trimmed_set(&["Enrolled".to_string()]),
        };
        assert!(values.is_missing("  "));
        assert!(values.is_missing(" -999 "));
        assert!(!values.is_missing("-9990"));
        assert!(values.is_truthy("CHECKED"));
        assert!(values.is_death_term(" Death "));
        assert!(!values.is_enrolled("enrolled"));
    }

    #[test]
    fn treatment_group_matches_its_own_columns_only() {
        let group = TreatmentGroup {
            prefix: "intra_treatment".to_string(),
            options: BTreeMap::from([("2".to_string(), "Total Hip Arthroplasty".to_string())]),
        };
        assert_eq!(group.label_for("intra_treatment___2"), Some("Total Hip Arthroplasty"));
        assert_eq!(group.label_for("intra_treatment___9"), None);
        assert_eq!(group.label_for("intraop_treatment___2"), None);
        assert_eq!(group.label_for("intra_treatment_2"), None);
    }

    #[test]
    fn treatment_classes_fall_back_to_the_description() {
        let rules = TreatmentRules {
            checked: DEFAULT_CHECKED_VALUES.iter().map(ToString::to_string).collect(),
            groups: Vec::new(),
            classes: BTreeMap::from([(
                "dynamic hip screw".to_string(),
                "Fixation".to_string(),
            )]),
        };
        assert_eq!(rules.classify("Dynamic Hip Screw"), "Fixation");
        assert_eq!(rules.classify("Girdlestone"), "Girdlestone");
        assert!(rules.is_checked(" TRUE "));
        assert!(!rules.is_checked("Unchecked"));
    }

    #[test]
    fn added_variant_extends_existing_stage() {
        let mut dictionary =
            TimepointDictionary::new(vec![(TimepointStage::Pod1, vec!["POD 1".to_string()])]);
        dictionary.add_variant(TimepointStage::Pod1, "Post-fracture day 1");
        dictionary.add_variant(TimepointStage::Week2, "2 weeks");
        assert_eq!(dictionary.variants(TimepointStage::Pod1).len(), 2);
        assert_eq!(dictionary.entries().len(), 2);
        assert!(dictionary.variants(TimepointStage::Month6).is_empty());
    }
}
