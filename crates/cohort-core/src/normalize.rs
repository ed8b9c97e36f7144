//! Renaming and missing-value normalization of raw rows.

use std::collections::BTreeMap;

use tracing::{debug, info_span};

use cohort_ingest::RawTable;
use cohort_model::CanonicalField;
use cohort_standards::ValueVocabulary;

use crate::schema::ResolvedSchema;

/// A raw row re-keyed by canonical field, with missing values removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRow {
    index: usize,
    values: BTreeMap<CanonicalField, String>,
}

impl NormalizedRow {
    pub fn new(index: usize, values: BTreeMap<CanonicalField, String>) -> Self {
        Self { index, values }
    }

    /// Position of the row in the export.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.values.contains_key(&field)
    }

    pub fn set(&mut self, field: CanonicalField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn values(&self) -> &BTreeMap<CanonicalField, String> {
        &self.values
    }
}

/// Apply the resolved schema and the missing-value vocabulary to every row.
///
/// Coalesce columns only fill fields still empty after renaming.
pub fn normalize_rows(
    table: &RawTable,
    schema: &ResolvedSchema,
    vocabulary: &ValueVocabulary,
) -> Vec<NormalizedRow> {
    let span = info_span!("normalize_rows", rows = table.row_count());
    let _guard = span.enter();

    let present = |row: usize, column: usize| {
        table
            .value(row, column)
            .filter(|value| !vocabulary.is_missing(value))
    };

    let mut blanked = 0usize;
    let rows = (0..table.row_count())
        .map(|row| {
            let mut values = BTreeMap::new();
            for &(column, field) in schema.fields() {
                match present(row, column) {
                    Some(value) => {
                        values.insert(field, value.to_string());
                    }
                    None if table.value(row, column).is_some() => blanked += 1,
                    None => {}
                }
            }
            for (field, columns) in schema.coalesce() {
                if values.contains_key(field) {
                    continue;
                }
                if let Some(value) = columns.iter().find_map(|&column| present(row, column)) {
                    values.insert(*field, value.to_string());
                }
            }
            NormalizedRow::new(row, values)
        })
        .collect();

    debug!(sentinels = blanked, "missing-value sentinels nulled");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::resolve_schema;
    use cohort_standards::{CoalesceRule, SynonymRule};
    use std::collections::BTreeSet;

    fn vocabulary() -> ValueVocabulary {
        ValueVocabulary {
            missing: BTreeSet::from(["-999".to_string(), "Not applicable".to_string()]),
            ..ValueVocabulary::default()
        }
    }

    #[test]
    fn sentinels_become_null_and_coalesce_fills_gaps() {
        let table = RawTable::from_strings(
            &["record_id", "lab_timepoint", "teg_preop_tp", "teg_fu_tp"],
            &[
                &["1", "POD 1", "Pre-Op", ""],
                &["1", "-999", "", "6 week"],
                &["1", "Not applicable", "", ""],
            ],
        );
        let synonyms = [
            SynonymRule {
                field: CanonicalField::GroupKey,
                columns: vec!["record_id".to_string()],
            },
            SynonymRule {
                field: CanonicalField::TimepointLabel,
                columns: vec!["lab_timepoint".to_string()],
            },
        ];
        let coalesce = [CoalesceRule {
            field: CanonicalField::TimepointLabel,
            columns: vec!["teg_preop_tp".to_string(), "teg_fu_tp".to_string()],
        }];
        let schema = resolve_schema(table.headers(), &synonyms, &coalesce);
        let rows = normalize_rows(&table, &schema, &vocabulary());

        assert_eq!(rows[0].get(CanonicalField::TimepointLabel), Some("POD 1"));
        assert_eq!(rows[1].get(CanonicalField::TimepointLabel), Some("6 week"));
        assert_eq!(rows[2].get(CanonicalField::TimepointLabel), None);
        assert_eq!(rows[2].index(), 2);
    }
}
