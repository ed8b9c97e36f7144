//! Exclusion, identity resolution, and enrollment filtering.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{info, info_span, warn};

use cohort_model::{CanonicalField, PatientId};
use cohort_standards::{ExclusionList, ValueVocabulary};

use crate::normalize::NormalizedRow;
use crate::review::ReviewReport;

/// Rows of one resolved patient, in input order.
pub type PatientRows = BTreeMap<PatientId, Vec<NormalizedRow>>;

fn row_id(row: &NormalizedRow) -> Option<PatientId> {
    row.get(CanonicalField::PatientId)
        .and_then(|raw| PatientId::new(raw).ok())
}

fn group_key(row: &NormalizedRow) -> Option<&str> {
    row.get(CanonicalField::GroupKey)
}

/// Remove excluded patients before identities are filled.
///
/// A row is matched on its own patient ID or on its group key. Every row of
/// a group that contains a matched row is removed with it.
pub fn apply_exclusions(
    rows: Vec<NormalizedRow>,
    exclusions: &ExclusionList,
    review: &mut ReviewReport,
) -> Vec<NormalizedRow> {
    if exclusions.is_empty() {
        return rows;
    }
    let span = info_span!("apply_exclusions", rows = rows.len());
    let _guard = span.enter();

    let mut excluded_groups: BTreeSet<String> = BTreeSet::new();
    let mut excluded_rows: BTreeSet<usize> = BTreeSet::new();
    for row in &rows {
        let candidates = [row_id(row), group_key(row).and_then(|key| PatientId::new(key).ok())];
        for id in candidates.into_iter().flatten() {
            let Some(reason) = exclusions.reason_for(&id) else {
                continue;
            };
            if !review.excluded.contains_key(&id) {
                info!(patient = %id, reason, "excluding patient");
                review.excluded.insert(id, reason.to_string());
            }
            excluded_rows.insert(row.index());
            if let Some(key) = group_key(row) {
                excluded_groups.insert(key.to_string());
            }
        }
    }

    let before = rows.len();
    let kept: Vec<NormalizedRow> = rows
        .into_iter()
        .filter(|row| {
            !excluded_rows.contains(&row.index())
                && !group_key(row).is_some_and(|key| excluded_groups.contains(key))
        })
        .collect();
    info!(
        removed_rows = before - kept.len(),
        patients = review.excluded.len(),
        "exclusions applied"
    );
    kept
}

/// Group rows by patient.
///
/// Rows sharing a group key are one subject entry: the patient ID is
/// forward-filled then backward-filled within the group, and a group with no
/// ID at all takes its group key as the ID. Rows without a group key stand
/// alone; those without an ID are dropped.
pub fn resolve_identities(rows: Vec<NormalizedRow>, review: &mut ReviewReport) -> PatientRows {
    let span = info_span!("resolve_identities", rows = rows.len());
    let _guard = span.enter();

    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<NormalizedRow>> = HashMap::new();
    let mut patients = PatientRows::new();

    for row in rows {
        match group_key(&row).map(str::to_string) {
            Some(key) => {
                if !groups.contains_key(&key) {
                    group_order.push(key.clone());
                }
                groups.entry(key).or_default().push(row);
            }
            None => match row_id(&row) {
                Some(id) => patients.entry(id).or_default().push(row),
                None => {
                    warn!(row = row.index(), "dropping row with neither group key nor patient id");
                    review.unidentified_rows += 1;
                }
            },
        }
    }

    for key in group_order {
        let Some(rows) = groups.remove(&key) else {
            continue;
        };
        let ids = fill_group_ids(&rows);
        let fallback = PatientId::new(&key).ok();
        for (row, id) in rows.into_iter().zip(ids) {
            match id.or_else(|| fallback.clone()) {
                Some(id) => patients.entry(id).or_default().push(row),
                None => {
                    warn!(row = row.index(), group = %key, "dropping row without usable patient id");
                    review.unidentified_rows += 1;
                }
            }
        }
    }

    for rows in patients.values_mut() {
        rows.sort_by_key(NormalizedRow::index);
    }
    info!(patients = patients.len(), "identities resolved");
    patients
}

/// Forward-fill then backward-fill the patient ID across one group.
fn fill_group_ids(rows: &[NormalizedRow]) -> Vec<Option<PatientId>> {
    let mut ids: Vec<Option<PatientId>> = rows.iter().map(row_id).collect();
    let mut carried: Option<PatientId> = None;
    for id in ids.iter_mut() {
        if id.is_some() {
            carried.clone_from(id);
        } else {
            id.clone_from(&carried);
        }
    }
    let mut carried: Option<PatientId> = None;
    for id in ids.iter_mut().rev() {
        if id.is_some() {
            carried.clone_from(id);
        } else {
            id.clone_from(&carried);
        }
    }
    ids
}

/// Keep patients with at least one enrolled row.
///
/// Only applies when the export carries an enrollment status.
pub fn retain_enrolled(
    patients: PatientRows,
    vocabulary: &ValueVocabulary,
    review: &mut ReviewReport,
) -> PatientRows {
    let span = info_span!("retain_enrolled", patients = patients.len());
    let _guard = span.enter();

    let (kept, dropped): (PatientRows, PatientRows) = patients.into_iter().partition(|(_, rows)| {
        rows.iter().any(|row| {
            row.get(CanonicalField::EnrollmentStatus)
                .is_some_and(|status| vocabulary.is_enrolled(status))
        })
    });
    for id in dropped.into_keys() {
        info!(patient = %id, "dropping patient never enrolled");
        review.not_enrolled.push(id);
    }
    kept
}
