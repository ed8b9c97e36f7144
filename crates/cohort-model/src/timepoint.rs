//! Clinical timepoint stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Canonical clinical stage of a blood draw.
///
/// Variants are declared in clinical order, so the derived `Ord` is the
/// stage order. Not every stage carries a clinical rank (see
/// [`TimepointStage::rank`]); comparisons that depend on rank must go
/// through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum TimepointStage {
    Admission,
    Pfd1,
    Pfd2,
    Pfd3,
    Pfd4,
    PreOp,
    PostOp,
    Pod1,
    Pod2,
    Pod3,
    Pod4,
    Pod5,
    Pod6,
    Pod7,
    Pod8,
    Pod9,
    Pod10,
    Week2,
    Week4,
    Week6,
    Week10,
    Month3,
    Month6,
    Unscheduled,
}

impl TimepointStage {
    pub const ALL: [TimepointStage; 24] = [
        TimepointStage::Admission,
        TimepointStage::Pfd1,
        TimepointStage::Pfd2,
        TimepointStage::Pfd3,
        TimepointStage::Pfd4,
        TimepointStage::PreOp,
        TimepointStage::PostOp,
        TimepointStage::Pod1,
        TimepointStage::Pod2,
        TimepointStage::Pod3,
        TimepointStage::Pod4,
        TimepointStage::Pod5,
        TimepointStage::Pod6,
        TimepointStage::Pod7,
        TimepointStage::Pod8,
        TimepointStage::Pod9,
        TimepointStage::Pod10,
        TimepointStage::Week2,
        TimepointStage::Week4,
        TimepointStage::Week6,
        TimepointStage::Week10,
        TimepointStage::Month3,
        TimepointStage::Month6,
        TimepointStage::Unscheduled,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TimepointStage::Admission => "Admission",
            TimepointStage::Pfd1 => "PFD1",
            TimepointStage::Pfd2 => "PFD2",
            TimepointStage::Pfd3 => "PFD3",
            TimepointStage::Pfd4 => "PFD4",
            TimepointStage::PreOp => "Pre_Op",
            TimepointStage::PostOp => "Post_Op",
            TimepointStage::Pod1 => "POD1",
            TimepointStage::Pod2 => "POD2",
            TimepointStage::Pod3 => "POD3",
            TimepointStage::Pod4 => "POD4",
            TimepointStage::Pod5 => "POD5",
            TimepointStage::Pod6 => "POD6",
            TimepointStage::Pod7 => "POD7",
            TimepointStage::Pod8 => "POD8",
            TimepointStage::Pod9 => "POD9",
            TimepointStage::Pod10 => "POD10",
            TimepointStage::Week2 => "Week2",
            TimepointStage::Week4 => "Week4",
            TimepointStage::Week6 => "Week6",
            TimepointStage::Week10 => "Week10",
            TimepointStage::Month3 => "Month3",
            TimepointStage::Month6 => "Month6",
            TimepointStage::Unscheduled => "Unscheduled",
        }
    }

    /// Clinical rank used for post-event truncation.
    ///
    /// Post-fracture days, `Month6`, and the unscheduled sentinel are
    /// unranked; truncation never touches them.
    pub fn rank(&self) -> Option<u8> {
        let rank = match self {
            TimepointStage::Admission => 1,
            TimepointStage::PreOp => 2,
            TimepointStage::PostOp => 3,
            TimepointStage::Pod1 => 4,
            TimepointStage::Pod2 => 5,
            TimepointStage::Pod3 => 6,
            TimepointStage::Pod4 => 7,
            TimepointStage::Pod5 => 8,
            TimepointStage::Pod6 => 9,
            TimepointStage::Pod7 => 10,
            TimepointStage::Pod8 => 11,
            TimepointStage::Pod9 => 12,
            TimepointStage::Pod10 => 13,
            TimepointStage::Week2 => 14,
            TimepointStage::Week4 => 15,
            TimepointStage::Week6 => 16,
            TimepointStage::Week10 => 17,
            TimepointStage::Month3 => 18,
            TimepointStage::Pfd1
            | TimepointStage::Pfd2
            | TimepointStage::Pfd3
            | TimepointStage::Pfd4
            | TimepointStage::Month6
            | TimepointStage::Unscheduled => return None,
        };
        Some(rank)
    }
}

impl fmt::Display for TimepointStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimepointStage {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        TimepointStage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ModelError::UnknownStage(trimmed.to_string()))
    }
}

impl TryFrom<String> for TimepointStage {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimepointStage> for &'static str {
    fn from(stage: TimepointStage) -> Self {
        stage.name()
    }
}

/// A canonicalized timepoint label.
///
/// Labels that the dictionary cannot place are carried through verbatim so
/// they can be reviewed; they are never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum TimepointLabel {
    Resolved(TimepointStage),
    Unresolved(String),
}

impl TimepointLabel {
    pub fn stage(&self) -> Option<TimepointStage> {
        match self {
            TimepointLabel::Resolved(stage) => Some(*stage),
            TimepointLabel::Unresolved(_) => None,
        }
    }

    /// Rank of the resolved stage; `None` for unresolved labels and unranked
    /// stages.
    pub fn rank(&self) -> Option<u8> {
        self.stage().and_then(|stage| stage.rank())
    }

    pub fn as_str(&self) -> &str {
        match self {
            TimepointLabel::Resolved(stage) => stage.name(),
            TimepointLabel::Unresolved(raw) => raw,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TimepointLabel::Resolved(_))
    }
}

impl fmt::Display for TimepointLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_totally_ordered() {
        for pair in TimepointStage::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
        }
        assert!(TimepointStage::Pfd4 < TimepointStage::PreOp);
        assert!(TimepointStage::Pod10 < TimepointStage::Week2);
    }

    #[test]
    fn unscheduled_has_no_rank() {
        assert_eq!(TimepointStage::Unscheduled.rank(), None);
        assert_eq!(TimepointStage::Admission.rank(), Some(1));
        assert!(TimepointStage::Pod1.rank() > TimepointStage::PostOp.rank());
    }

    #[test]
    fn post_fracture_days_and_month6_are_unranked() {
        for stage in [
            TimepointStage::Pfd1,
            TimepointStage::Pfd2,
            TimepointStage::Pfd3,
            TimepointStage::Pfd4,
            TimepointStage::Month6,
        ] {
            assert_eq!(stage.rank(), None, "{stage}");
        }
        assert_eq!(TimepointStage::PreOp.rank(), Some(2));
        assert_eq!(TimepointStage::Month3.rank(), Some(18));
    }

    #[test]
    fn ranks_increase_across_ranked_stages() {
        let ranks: Vec<u8> = TimepointStage::ALL
            .iter()
            .filter_map(TimepointStage::rank)
            .collect();
        assert_eq!(ranks, (1..=18).collect::<Vec<u8>>());
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("pre_op".parse::<TimepointStage>().unwrap(), TimepointStage::PreOp);
        assert_eq!(" POD10 ".parse::<TimepointStage>().unwrap(), TimepointStage::Pod10);
        assert!(matches!(
            "Day 1".parse::<TimepointStage>(),
            Err(ModelError::UnknownStage(_))
        ));
    }

    #[test]
    fn unresolved_label_has_no_rank() {
        let label = TimepointLabel::Unresolved("Visit X".to_string());
        assert_eq!(label.rank(), None);
        assert_eq!(label.as_str(), "Visit X");
        assert!(!label.is_resolved());
    }
}
