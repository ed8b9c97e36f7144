//! Fields derived from several raw columns at once: joined columns and
//! treatment from procedure checkboxes.

use std::collections::BTreeSet;

use tracing::{debug, info_span};

use cohort_ingest::RawTable;
use cohort_model::CanonicalField;
use cohort_standards::{JoinRule, TreatmentRules, ValueVocabulary};

use crate::normalize::NormalizedRow;

#[derive(Debug, Clone, PartialEq)]
struct ResolvedJoin {
    field: CanonicalField,
    columns: Vec<usize>,
    separator: String,
}

/// Join and checkbox columns located in one export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedColumns {
    joins: Vec<ResolvedJoin>,
    /// Per checkbox group, in priority order: `(column, label)` in export order.
    treatment_groups: Vec<Vec<(usize, String)>>,
    treatment: TreatmentRules,
    claimed: BTreeSet<String>,
}

impl DerivedColumns {
    /// Locate derived-field columns in `headers`.
    ///
    /// A join is used only when every one of its columns is present.
    pub fn resolve(headers: &[String], joins: &[JoinRule], treatment: &TreatmentRules) -> Self {
        let position = |name: &str| headers.iter().position(|header| header.trim() == name);
        let mut derived = Self {
            treatment: treatment.clone(),
            ..Self::default()
        };

        for rule in joins {
            let columns: Option<Vec<usize>> =
                rule.columns.iter().map(|name| position(name)).collect();
            let Some(columns) = columns else {
                continue;
            };
            derived
                .claimed
                .extend(columns.iter().map(|&index| headers[index].trim().to_string()));
            derived.joins.push(ResolvedJoin {
                field: rule.field,
                columns,
                separator: rule.separator.clone(),
            });
        }

        for group in &treatment.groups {
            let columns: Vec<(usize, String)> = headers
                .iter()
                .enumerate()
                .filter_map(|(index, header)| {
                    group
                        .label_for(header)
                        .map(|label| (index, label.to_string()))
                })
                .collect();
            if columns.is_empty() {
                continue;
            }
            derived
                .claimed
                .extend(columns.iter().map(|&(index, _)| headers[index].trim().to_string()));
            derived.treatment_groups.push(columns);
        }

        debug!(
            joins = derived.joins.len(),
            treatment_groups = derived.treatment_groups.len(),
            "derived columns resolved"
        );
        derived
    }

    /// Whether `column` feeds a derived field.
    pub fn claims(&self, column: &str) -> bool {
        self.claimed.contains(column.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty() && self.treatment_groups.is_empty()
    }

    /// Fill derived fields on every row. A derived value replaces whatever
    /// the row held for the field; rows with nothing to derive keep theirs.
    /// Treatment descriptions are then mapped to their class.
    pub fn apply(&self, table: &RawTable, rows: &mut [NormalizedRow], vocabulary: &ValueVocabulary) {
        let span = info_span!("derive_fields", rows = rows.len());
        let _guard = span.enter();

        let present = |row: usize, column: usize| {
            table
                .value(row, column)
                .filter(|value| !vocabulary.is_missing(value))
        };

        let mut derived = 0usize;
        for row in rows.iter_mut() {
            let index = row.index();
            for join in &self.joins {
                let parts: Vec<&str> = join
                    .columns
                    .iter()
                    .filter_map(|&column| present(index, column))
                    .collect();
                if !parts.is_empty() {
                    row.set(join.field, parts.join(&join.separator));
                    derived += 1;
                }
            }

            let ticked = self.treatment_groups.iter().find_map(|group| {
                let labels: Vec<&str> = group
                    .iter()
                    .filter(|(column, _)| {
                        table
                            .value(index, *column)
                            .is_some_and(|value| self.treatment.is_checked(value))
                    })
                    .map(|(_, label)| label.as_str())
                    .collect();
                (!labels.is_empty()).then(|| labels.join("/"))
            });
            if let Some(procedure) = ticked {
                row.set(CanonicalField::Treatment, procedure);
                derived += 1;
            }
            if let Some(procedure) = row.get(CanonicalField::Treatment) {
                let class = self.treatment.classify(procedure);
                if class != procedure {
                    let class = class.to_string();
                    row.set(CanonicalField::Treatment, class);
                }
            }
        }
        debug!(values = derived, "derived fields filled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_standards::{DEFAULT_CHECKED_VALUES, TreatmentGroup};
    use std::collections::{BTreeMap, BTreeSet};

    fn treatment() -> TreatmentRules {
        let options = BTreeMap::from([
            ("1".to_string(), "Hemi-arthroplasty (monopolar, bipolar)".to_string()),
            ("6".to_string(), "Dynamic Hip Screw".to_string()),
            ("7".to_string(), "Other".to_string()),
        ]);
        TreatmentRules {
            checked: DEFAULT_CHECKED_VALUES.iter().map(ToString::to_string).collect(),
            groups: vec![
                TreatmentGroup {
                    prefix: "intra_treatment".to_string(),
                    options: options.clone(),
                },
                TreatmentGroup {
                    prefix: "intraop_treatment".to_string(),
                    options,
                },
            ],
            classes: BTreeMap::from([
                ("dynamic hip screw/other".to_string(), "Fixation".to_string()),
                ("hemi-arthroplasty (monopolar, bipolar)".to_string(), "Arthoplasty".to_string()),
            ]),
        }
    }

    fn ota_join() -> JoinRule {
        JoinRule {
            field: CanonicalField::AoOta,
            columns: vec!["ota_type_61".to_string(), "ota_type_62".to_string()],
            separator: "/".to_string(),
        }
    }

    fn vocabulary() -> ValueVocabulary {
        ValueVocabulary {
            missing: BTreeSet::from(["-999".to_string()]),
            ..ValueVocabulary::default()
        }
    }

    fn blank_rows(table: &RawTable) -> Vec<NormalizedRow> {
        (0..table.row_count())
            .map(|index| NormalizedRow::new(index, BTreeMap::new()))
            .collect()
    }

    #[test]
    fn fracture_class_columns_are_joined() {
        let table = RawTable::from_strings(
            &["record_id", "ota_type_61", "ota_type_62"],
            &[
                &["1", "61-A1", "62-B2"],
                &["1", "", "62-C1"],
                &["1", "-999", ""],
            ],
        );
        let derived = DerivedColumns::resolve(table.headers(), &[ota_join()], &TreatmentRules::default());
        assert!(derived.claims("ota_type_61"));
        assert!(!derived.claims("record_id"));

        let mut rows = blank_rows(&table);
        rows[2].set(CanonicalField::AoOta, "61-A2");
        derived.apply(&table, &mut rows, &vocabulary());
        assert_eq!(rows[0].get(CanonicalField::AoOta), Some("61-A1/62-B2"));
        assert_eq!(rows[1].get(CanonicalField::AoOta), Some("62-C1"));
        assert_eq!(rows[2].get(CanonicalField::AoOta), Some("61-A2"));
    }

    #[test]
    fn join_needs_every_column() {
        let table = RawTable::from_strings(&["record_id", "ota_type_61"], &[&["1", "61-A1"]]);
        let derived = DerivedColumns::resolve(table.headers(), &[ota_join()], &TreatmentRules::default());
        assert!(derived.is_empty());
        assert!(!derived.claims("ota_type_61"));

        let mut rows = blank_rows(&table);
        derived.apply(&table, &mut rows, &vocabulary());
        assert_eq!(rows[0].get(CanonicalField::AoOta), None);
    }

    #[test]
    fn ticked_boxes_become_a_classified_treatment() {
        let table = RawTable::from_strings(
            &[
                "record_id",
                "intra_treatment___1",
                "intra_treatment___6",
                "intra_treatment___7",
                "intraop_treatment___1",
            ],
            &[
                &["1", "Unchecked", "Checked", "1", "Checked"],
                &["2", "", "", "", "true"],
                &["3", "", "", "TRUE", ""],
                &["4", "Unchecked", "", "", ""],
            ],
        );
        let derived = DerivedColumns::resolve(table.headers(), &[], &treatment());
        assert!(derived.claims("intraop_treatment___1"));

        let mut rows = blank_rows(&table);
        derived.apply(&table, &mut rows, &vocabulary());
        // Hip checkboxes win over the pathway group.
        assert_eq!(rows[0].get(CanonicalField::Treatment), Some("Fixation"));
        assert_eq!(rows[1].get(CanonicalField::Treatment), Some("Arthoplasty"));
        // "Other" has no class here and passes through.
        assert_eq!(rows[2].get(CanonicalField::Treatment), Some("Other"));
        assert_eq!(rows[3].get(CanonicalField::Treatment), None);
    }

    #[test]
    fn recorded_treatment_text_is_classified() {
        let table = RawTable::from_strings(&["record_id"], &[&["1"]]);
        let derived = DerivedColumns::resolve(table.headers(), &[], &treatment());
        let mut rows = blank_rows(&table);
        rows[0].set(CanonicalField::Treatment, "Dynamic Hip Screw/Other");
        derived.apply(&table, &mut rows, &vocabulary());
        assert_eq!(rows[0].get(CanonicalField::Treatment), Some("Fixation"));
    }
}
