use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::{info, info_span};

use cohort_core::{Cohort, CohortPipeline};
use cohort_ingest::{CsvExport, ExportSource};
use cohort_model::Patient;
use cohort_standards::{StudyConfig, load_study_config};

use crate::logging::redact_value;
use crate::types::{OutputPaths, RunResult};

pub const DEMOGRAPHICS_FILE: &str = "demographics.csv";
pub const OBSERVATIONS_FILE: &str = "observations.csv";

/// Inputs of `cohort run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub export: PathBuf,
    pub config: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub delimiter: u8,
    pub dry_run: bool,
}

pub fn load_config(path: Option<&Path>) -> Result<StudyConfig> {
    load_study_config(path).context("load study config")
}

fn build_cohort(export: &Path, delimiter: u8, config: StudyConfig) -> Result<(String, Cohort)> {
    let source = CsvExport::new(export).with_delimiter(delimiter);
    let name = source.describe();
    let cohort = CohortPipeline::new(config)
        .run(&source)
        .with_context(|| format!("process export {name}"))?;
    Ok((name, cohort))
}

pub fn run_cohort(options: &RunOptions) -> Result<RunResult> {
    let span = info_span!("run", export = %options.export.display());
    let _guard = span.enter();

    let config = load_config(options.config.as_deref())?;
    let (source, cohort) = build_cohort(&options.export, options.delimiter, config)?;

    let outputs = if options.dry_run {
        info!("dry run, no files written");
        None
    } else {
        let dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(&options.export));
        Some(write_outputs(&cohort, &dir)?)
    };

    Ok(RunResult {
        source,
        outputs,
        cohort,
    })
}

pub fn run_patient(export: &Path, id: &str, config: Option<&Path>, delimiter: u8) -> Result<Patient> {
    let config = load_config(config)?;
    let (source, cohort) = build_cohort(export, delimiter, config)?;
    let patient = cohort
        .get_patient(id)
        .cloned()
        .ok_or_else(|| anyhow!("patient {id} not found in {source}"))?;
    info!(
        patient = redact_value(patient.id().as_str()),
        observations = patient.observations().len(),
        "patient found"
    );
    Ok(patient)
}

/// `<export dir>/output`.
pub fn default_output_dir(export: &Path) -> PathBuf {
    export
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("output")
}

pub fn write_outputs(cohort: &Cohort, dir: &Path) -> Result<OutputPaths> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let demographics = dir.join(DEMOGRAPHICS_FILE);
    let mut frame = cohort.all_demographics()?;
    write_csv(&mut frame, &demographics)?;

    let observations = dir.join(OBSERVATIONS_FILE);
    let mut frame = cohort.all_observations()?;
    write_csv(&mut frame, &observations)?;

    info!(dir = %dir.display(), "output tables written");
    Ok(OutputPaths {
        dir: dir.to_path_buf(),
        demographics,
        observations,
    })
}

fn write_csv(frame: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(frame)
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), rows = frame.height(), "table written");
    Ok(())
}
