//! Timepoint canonicalization.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use cohort_model::{TimepointLabel, TimepointStage};
use cohort_standards::TimepointDictionary;

use crate::review::VariantCollision;

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Lookup key for a free-text label: trimmed, lower-cased, inner whitespace
/// collapsed.
pub fn label_key(raw: &str) -> String {
    WHITESPACE_REGEX
        .replace_all(raw.trim(), " ")
        .to_lowercase()
}

/// Inverted timepoint dictionary.
#[derive(Debug, Clone, Default)]
pub struct TimepointIndex {
    lookup: HashMap<String, TimepointStage>,
    collisions: Vec<VariantCollision>,
}

impl TimepointIndex {
    /// Invert `dictionary`. When a variant appears under several stages the
    /// last declaration wins. Canonical stage names resolve to their own
    /// stage unless a variant already claims them.
    pub fn build(dictionary: &TimepointDictionary) -> Self {
        let mut lookup: HashMap<String, TimepointStage> = HashMap::new();
        let mut collisions = Vec::new();
        for (stage, variants) in dictionary.entries() {
            for variant in variants {
                let key = label_key(variant);
                if key.is_empty() {
                    continue;
                }
                match lookup.insert(key, *stage) {
                    Some(ignored) if ignored != *stage => {
                        warn!(
                            variant = %variant.trim(),
                            kept = %stage,
                            ignored = %ignored,
                            "timepoint variant declared under two stages, later stage kept"
                        );
                        collisions.push(VariantCollision {
                            variant: variant.trim().to_string(),
                            kept: *stage,
                            ignored,
                        });
                    }
                    _ => {}
                }
            }
        }
        for stage in TimepointStage::ALL {
            lookup.entry(label_key(stage.name())).or_insert(stage);
        }
        debug!(variants = lookup.len(), "timepoint index built");
        Self { lookup, collisions }
    }

    pub fn canonicalize(&self, raw: &str) -> TimepointLabel {
        match self.lookup.get(&label_key(raw)) {
            Some(stage) => TimepointLabel::Resolved(*stage),
            None => TimepointLabel::Unresolved(raw.trim().to_string()),
        }
    }

    pub fn collisions(&self) -> &[VariantCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// For a patient with no `Admission` draw, relabel every `Pre_Op` draw as
/// `Admission`. Returns the number of relabelled rows.
pub fn promote_pre_op_to_admission(labels: &mut [Option<TimepointLabel>]) -> usize {
    let is_stage = |label: &Option<TimepointLabel>, stage: TimepointStage| {
        label.as_ref().and_then(TimepointLabel::stage) == Some(stage)
    };
    if labels
        .iter()
        .any(|label| is_stage(label, TimepointStage::Admission))
    {
        return 0;
    }
    let mut promoted = 0;
    for label in labels.iter_mut() {
        if is_stage(label, TimepointStage::PreOp) {
            *label = Some(TimepointLabel::Resolved(TimepointStage::Admission));
            promoted += 1;
        }
    }
    promoted
}
