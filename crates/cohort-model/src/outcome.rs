//! Per-patient outcome state reduced from repeated-measure rows.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::field::{Comorbidity, Complication};
use crate::timepoint::TimepointStage;

/// Combined thrombosis category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum ThrombosisCategory {
    Both,
    Dvt,
    Pe,
    /// Superficial vein thrombosis; only assigned by configured override.
    Superficial,
}

impl ThrombosisCategory {
    /// Category implied by the two thrombosis flags.
    pub fn from_flags(dvt: bool, pe: bool) -> Option<Self> {
        match (dvt, pe) {
            (true, true) => Some(ThrombosisCategory::Both),
            (true, false) => Some(ThrombosisCategory::Dvt),
            (false, true) => Some(ThrombosisCategory::Pe),
            (false, false) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThrombosisCategory::Both => "Both",
            ThrombosisCategory::Dvt => "DVT",
            ThrombosisCategory::Pe => "PE",
            ThrombosisCategory::Superficial => "SVT",
        }
    }

    /// Parse a configured override name.
    pub fn parse(value: &str) -> Option<Self> {
        [
            ThrombosisCategory::Both,
            ThrombosisCategory::Dvt,
            ThrombosisCategory::Pe,
            ThrombosisCategory::Superficial,
        ]
        .into_iter()
        .find(|category| category.name().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for ThrombosisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ThrombosisCategory> for &'static str {
    fn from(category: ThrombosisCategory) -> Self {
        category.name()
    }
}

/// Render a flag the way the output tables spell it.
pub fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Patient-level outcome flags.
///
/// Every boolean is the logical OR over the patient's rows, except that a
/// death indication forces `withdrawn` to false.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcomes {
    pub dvt: bool,
    pub pe: bool,
    pub thrombosis: Option<ThrombosisCategory>,
    /// Stage of the thrombotic event, when known.
    pub adverse_event_stage: Option<TimepointStage>,
    pub death: bool,
    pub withdrawn: bool,
    pub comorbidities: BTreeMap<Comorbidity, bool>,
    pub complications: BTreeMap<Complication, bool>,
    pub uti: bool,
    /// Sum of transfused packed red cell units.
    pub transfused_rbc_units: f64,
}

impl Outcomes {
    pub fn has_vte(&self) -> bool {
        self.thrombosis.is_some()
    }

    pub fn transfused(&self) -> bool {
        self.transfused_rbc_units > 0.0
    }

    pub fn comorbidity(&self, value: Comorbidity) -> bool {
        self.comorbidities.get(&value).copied().unwrap_or(false)
    }

    pub fn complication(&self, value: Complication) -> bool {
        self.complications.get(&value).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_flags() {
        assert_eq!(
            ThrombosisCategory::from_flags(true, true),
            Some(ThrombosisCategory::Both)
        );
        assert_eq!(
            ThrombosisCategory::from_flags(false, true),
            Some(ThrombosisCategory::Pe)
        );
        assert_eq!(ThrombosisCategory::from_flags(false, false), None);
    }

    #[test]
    fn vte_follows_category() {
        let mut outcomes = Outcomes::default();
        assert!(!outcomes.has_vte());
        outcomes.thrombosis = ThrombosisCategory::parse("svt");
        assert!(outcomes.has_vte());
        assert_eq!(yes_no(outcomes.has_vte()), "Yes");
    }
}
