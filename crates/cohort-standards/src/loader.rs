#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::config::StudyConfig;
use crate::error::{ConfigError, Result};
use crate::file::StudyConfigFile;

/// Environment variable naming a study config file to use instead of the
/// embedded default.
pub const CONFIG_ENV_VAR: &str = "COHORT_CONFIG";

/// Default study configuration, embedded at compile time.
pub const DEFAULT_STUDY_CONFIG: &str = include_str!("../config/study.toml");

/// Config file selected by an explicit path, then by [`CONFIG_ENV_VAR`].
///
/// `None` means the embedded default applies.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Load the study configuration in effect for this run.
pub fn load_study_config(explicit: Option<&Path>) -> Result<StudyConfig> {
    match config_path(explicit) {
        Some(path) => load_config_file(&path),
        None => load_default_config(),
    }
}

pub fn load_default_config() -> Result<StudyConfig> {
    parse_config(DEFAULT_STUDY_CONFIG, "<embedded study.toml>")
}

pub fn load_config_file(path: &Path) -> Result<StudyConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    parse_config(&text, &path.display().to_string())
}

/// Parse and validate a TOML study configuration. `origin` names the source
/// in error messages.
pub fn parse_config(text: &str, origin: &str) -> Result<StudyConfig> {
    let file: StudyConfigFile = toml::from_str(text).map_err(|source| ConfigError::Toml {
        origin: origin.to_string(),
        source,
    })?;
    StudyConfig::try_from(file)
}
