//! End-to-end tests for the `cohort` commands.

use std::fs;
use std::path::{Path, PathBuf};

use cohort_cli::commands::{
    DEMOGRAPHICS_FILE, OBSERVATIONS_FILE, RunOptions, load_config, run_cohort, run_patient,
};
use cohort_cli::summary::{counts_table, review_table, timepoint_table};
use cohort_cli::types::CohortCounts;
use tempfile::TempDir;

const STUDY: &str = r#"
[config]
schema = "cohort-study"
schema_version = 1

[values]
missing = ["-999"]
truthy = ["yes"]
death_terms = ["death"]

[[synonyms]]
field = "GroupKey"
columns = ["record_id"]

[[synonyms]]
field = "PatientID"
columns = ["patient_id"]

[[synonyms]]
field = "Age"
columns = ["age"]

[[synonyms]]
field = "TimepointLabel"
columns = ["timepoint"]

[[synonyms]]
field = "Hemoglobin"
columns = ["lab_hemoglobin"]

[[synonyms]]
field = "DrawDate"
columns = ["draw_date"]

[[synonyms]]
field = "DrawTime"
columns = ["draw_time"]

[[synonyms]]
field = "InjuryDate"
columns = ["injury_date"]

[[synonyms]]
field = "InjuryTime"
columns = ["injury_time"]

[[synonyms]]
field = "DVT"
columns = ["dvt"]

[[synonyms]]
field = "Withdrawn"
columns = ["withdrawal_reason"]

[exclusions.patients]
"TH-226" = "Treated non-operatively"

[[timepoints]]
stage = "POD1"
variants = ["POD 1"]

[[timepoints]]
stage = "POD2"
variants = ["POD 2"]
"#;

const EXPORT: &str = "\
record_id,patient_id,age,timepoint,lab_hemoglobin,draw_date,draw_time,injury_date,injury_time,dvt,withdrawal_reason
1,P1,71,POD 1,110,2024-03-02,14:00,2024-03-01,08:00,No,
1,,,POD 2,104,2024-03-03,09:00,,,Yes,
2,TH-226,65,POD 1,120,2024-03-02,,,,,
3,P3,80,Visit 9,99,2024-03-04,,,,No,Death
3,,,,,,,,,,Lost to follow-up
";

struct Fixture {
    dir: TempDir,
    export: PathBuf,
    config: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let export = dir.path().join("export.csv");
    let config = dir.path().join("study.toml");
    fs::write(&export, EXPORT).expect("write export");
    fs::write(&config, STUDY).expect("write config");
    Fixture {
        dir,
        export,
        config,
    }
}

fn options(fixture: &Fixture, output_dir: Option<&Path>, dry_run: bool) -> RunOptions {
    RunOptions {
        export: fixture.export.clone(),
        config: Some(fixture.config.clone()),
        output_dir: output_dir.map(Path::to_path_buf),
        delimiter: b',',
        dry_run,
    }
}

#[test]
fn run_writes_both_tables() {
    let fixture = fixture();
    let out = fixture.dir.path().join("tables");
    let result = run_cohort(&options(&fixture, Some(&out), false)).expect("run");

    let outputs = result.outputs.expect("outputs written");
    assert_eq!(outputs.demographics, out.join(DEMOGRAPHICS_FILE));

    let demographics = fs::read_to_string(&outputs.demographics).unwrap();
    let header = demographics.lines().next().unwrap();
    assert!(header.starts_with("PatientID,Study,Age,"), "{header}");
    assert!(header.contains("time_injury_to_surgery_hours"));
    assert_eq!(demographics.lines().count(), 3);
    assert!(!demographics.contains("TH-226"));

    let observations = fs::read_to_string(out.join(OBSERVATIONS_FILE)).unwrap();
    assert_eq!(observations.lines().count(), 4);
    assert!(observations.lines().next().unwrap().contains("time_injury_to_lab_hours"));
    assert!(!observations.contains("TH-226"));
}

#[test]
fn dry_run_writes_nothing() {
    let fixture = fixture();
    let result = run_cohort(&options(&fixture, None, true)).expect("run");
    assert!(result.outputs.is_none());
    assert!(!fixture.dir.path().join("output").exists());
}

#[test]
fn counts_summarize_the_run() {
    let fixture = fixture();
    let result = run_cohort(&options(&fixture, None, true)).expect("run");
    let counts = CohortCounts::from_cohort(&result.cohort);

    insta::assert_json_snapshot!(counts, @r#"
    {
      "patients": 2,
      "observations": 3,
      "with_vte": 1,
      "deaths": 1,
      "withdrawn": 0,
      "excluded": 1,
      "not_enrolled": 0,
      "review_issues": 1
    }
    "#);

    let rendered = counts_table(&counts).to_string();
    assert!(rendered.contains("Observations"));
    let review = review_table(result.cohort.review())
        .expect("unresolved label is a finding")
        .to_string();
    assert!(review.contains("Unresolved timepoints"));
    assert!(review.contains("Visit 9 x1"));
}

#[test]
fn patient_lookup_is_case_insensitive() {
    let fixture = fixture();
    let patient = run_patient(&fixture.export, "p1", Some(&fixture.config), b',').expect("patient");
    assert_eq!(patient.id().as_str(), "P1");
    assert_eq!(patient.observations().len(), 2);
    assert_eq!(
        patient.observations()[0].offsets().injury_to_lab,
        Some(30.0)
    );

    let json = serde_json::to_value(&patient).unwrap();
    assert_eq!(json["id"], "P1");
    assert_eq!(json["outcomes"]["dvt"], true);
}

#[test]
fn excluded_patient_is_not_found() {
    let fixture = fixture();
    let error = run_patient(&fixture.export, "TH-226", Some(&fixture.config), b',').unwrap_err();
    assert!(error.to_string().contains("TH-226"));
}

#[test]
fn missing_group_key_fails_the_run() {
    let fixture = fixture();
    fs::write(&fixture.export, "patient_id,lab_hemoglobin\nP1,110\n").unwrap();
    let error = run_cohort(&options(&fixture, None, true)).unwrap_err();
    assert!(format!("{error:#}").contains("group key"));
}

#[test]
fn timepoint_listing_counts_variants() {
    let fixture = fixture();
    let config = load_config(Some(&fixture.config)).unwrap();
    let rendered = timepoint_table(&config).to_string();
    assert!(rendered.contains("POD1"));
    assert!(rendered.contains("Unscheduled"));
}
