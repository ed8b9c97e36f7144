//! Study configuration for the cohort timeline pipeline.
//!
//! All lookup tables the pipeline consults live here rather than in code:
//! field synonyms, coalesced columns, missing-value sentinels, the timepoint
//! dictionary, exclusions, study arms, medication and adverse-event tables.
//!
//! A default configuration is embedded at compile time. A different file can
//! be selected with an explicit path or the `COHORT_CONFIG` environment
//! variable.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod file;
pub mod loader;

pub use config::{
    CoalesceRule, DEFAULT_CHECKED_VALUES, ExclusionList, JoinRule, MedicationTable, StudyArms,
    StudyConfig, SynonymRule, TimepointDictionary, TreatmentGroup, TreatmentRules,
    ValueVocabulary,
};
pub use error::{ConfigError, Result};
pub use loader::{
    CONFIG_ENV_VAR, DEFAULT_STUDY_CONFIG, config_path, load_config_file, load_default_config,
    load_study_config, parse_config,
};
