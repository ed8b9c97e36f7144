//! Synonym resolution: raw export columns to canonical fields.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, info_span, warn};

use cohort_model::CanonicalField;
use cohort_standards::{CoalesceRule, SynonymRule};

use crate::review::ShadowedColumn;

/// One-to-one mapping from export columns to canonical fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSchema {
    /// `(column index, field)` in rule order.
    fields: Vec<(usize, CanonicalField)>,
    /// Fallback columns per field, in priority order.
    coalesce: Vec<(CanonicalField, Vec<usize>)>,
    headers: Vec<String>,
    pub shadowed: Vec<ShadowedColumn>,
    pub unknown: Vec<String>,
}

impl ResolvedSchema {
    pub fn fields(&self) -> &[(usize, CanonicalField)] {
        &self.fields
    }

    pub fn coalesce(&self) -> &[(CanonicalField, Vec<usize>)] {
        &self.coalesce
    }

    /// Whether the export can provide `field` at all.
    pub fn has_field(&self, field: CanonicalField) -> bool {
        self.fields.iter().any(|(_, mapped)| *mapped == field)
            || self.coalesce.iter().any(|(target, _)| *target == field)
    }

    /// Export column that resolved to `field`.
    pub fn column_for(&self, field: CanonicalField) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, mapped)| *mapped == field)
            .and_then(|(index, _)| self.headers.get(*index))
            .map(String::as_str)
    }
}

/// Resolve export headers against ordered synonym and coalesce rules.
///
/// A raw name belongs to the first rule that lists it. When two present
/// columns claim the same field, the one reached later in the pass is
/// shadowed. Columns no rule mentions are reported as unknown.
pub fn resolve_schema(
    headers: &[String],
    synonyms: &[SynonymRule],
    coalesce: &[CoalesceRule],
) -> ResolvedSchema {
    let span = info_span!("resolve_schema", columns = headers.len());
    let _guard = span.enter();

    let mut positions: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, header) in headers.iter().enumerate() {
        positions.entry(header.trim()).or_default().push(index);
    }

    let mut schema = ResolvedSchema {
        headers: headers.to_vec(),
        ..ResolvedSchema::default()
    };
    let mut claimed_names: BTreeSet<&str> = BTreeSet::new();
    let mut known_columns: BTreeSet<usize> = BTreeSet::new();
    let mut winners: BTreeMap<CanonicalField, usize> = BTreeMap::new();

    for rule in synonyms {
        for name in &rule.columns {
            let name = name.trim();
            if !claimed_names.insert(name) {
                continue;
            }
            let Some(indices) = positions.get(name) else {
                continue;
            };
            for &index in indices {
                known_columns.insert(index);
                match winners.get(&rule.field) {
                    None => {
                        winners.insert(rule.field, index);
                        schema.fields.push((index, rule.field));
                    }
                    Some(&kept) => {
                        warn!(
                            column = %headers[index],
                            field = %rule.field,
                            kept = %headers[kept],
                            "column shadowed by earlier synonym"
                        );
                        schema.shadowed.push(ShadowedColumn {
                            column: headers[index].clone(),
                            field: rule.field,
                            kept: headers[kept].clone(),
                        });
                    }
                }
            }
        }
    }

    for rule in coalesce {
        let indices: Vec<usize> = rule
            .columns
            .iter()
            .filter_map(|name| positions.get(name.trim()))
            .flatten()
            .copied()
            .collect();
        if indices.is_empty() {
            continue;
        }
        known_columns.extend(indices.iter().copied());
        debug!(field = %rule.field, columns = indices.len(), "coalescing columns");
        schema.coalesce.push((rule.field, indices));
    }

    for (index, header) in headers.iter().enumerate() {
        if !known_columns.contains(&index) {
            debug!(column = %header, "unknown column discarded");
            schema.unknown.push(header.clone());
        }
    }

    info!(
        resolved = schema.fields.len(),
        coalesced = schema.coalesce.len(),
        shadowed = schema.shadowed.len(),
        unknown = schema.unknown.len(),
        "schema resolved"
    );
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_model::LabMetric;

    fn rule(field: CanonicalField, columns: &[&str]) -> SynonymRule {
        SynonymRule {
            field,
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    const HGB: CanonicalField = CanonicalField::Metric(LabMetric::Hemoglobin);

    #[test]
    fn earlier_synonym_wins_and_later_is_shadowed() {
        let rules = [rule(HGB, &["bloodwork_hemoglobin", "lab_hemoglobin"])];
        let schema = resolve_schema(
            &headers(&["lab_hemoglobin", "bloodwork_hemoglobin"]),
            &rules,
            &[],
        );
        assert_eq!(schema.column_for(HGB), Some("bloodwork_hemoglobin"));
        assert_eq!(schema.shadowed.len(), 1);
        assert_eq!(schema.shadowed[0].column, "lab_hemoglobin");
        assert_eq!(schema.shadowed[0].kept, "bloodwork_hemoglobin");
    }

    #[test]
    fn raw_name_belongs_to_first_rule_listing_it() {
        let rules = [
            rule(CanonicalField::GroupKey, &["record_id"]),
            rule(CanonicalField::PatientId, &["patient_id", "record_id"]),
        ];
        let schema = resolve_schema(&headers(&["record_id"]), &rules, &[]);
        assert_eq!(schema.fields(), &[(0, CanonicalField::GroupKey)]);
        assert!(!schema.has_field(CanonicalField::PatientId));
        assert!(schema.shadowed.is_empty());
    }

    #[test]
    fn unknown_columns_are_reported() {
        let rules = [rule(CanonicalField::GroupKey, &["record_id"])];
        let coalesce = [CoalesceRule {
            field: CanonicalField::TimepointLabel,
            columns: vec!["teg_fu_tp".to_string()],
        }];
        let schema = resolve_schema(
            &headers(&["record_id", "redcap_event_name", "teg_fu_tp"]),
            &rules,
            &coalesce,
        );
        assert_eq!(schema.unknown, vec!["redcap_event_name".to_string()]);
        assert!(schema.has_field(CanonicalField::TimepointLabel));
        assert_eq!(schema.coalesce()[0].1, vec![2]);
    }
}
