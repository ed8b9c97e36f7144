//! CLI argument definitions for the cohort timeline builder.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cohort",
    version,
    about = "Cohort timeline builder - normalize longitudinal study exports",
    long_about = "Normalize a longitudinal clinical-study export into per-patient timelines.\n\n\
                  Resolves drifting column names and free-text timepoint labels, reconciles\n\
                  repeated rows per patient, and derives hour offsets from injury and surgery."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient identifiers and cell values in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the pipeline over an export and write the output tables.
    Run(RunArgs),

    /// Print the assembled timeline of one patient.
    Patient(PatientArgs),

    /// List canonical timepoint stages and their known variants.
    Timepoints(ConfigArgs),
}

#[derive(Parser)]
pub struct ConfigArgs {
    /// Study configuration file (default: $COHORT_CONFIG, then the built-in study).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the CSV export.
    #[arg(value_name = "EXPORT")]
    pub export: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output directory for the CSV tables (default: <EXPORT dir>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Field delimiter of the export: one ASCII character, or `\t` for tab.
    #[arg(long = "delimiter", default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct PatientArgs {
    /// Path to the CSV export.
    #[arg(value_name = "EXPORT")]
    pub export: PathBuf,

    /// Patient identifier (case-insensitive).
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Field delimiter of the export: one ASCII character, or `\t` for tab.
    #[arg(long = "delimiter", default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Print the timeline as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

/// Parse a `--delimiter` value into the byte the CSV reader expects.
fn parse_delimiter(value: &str) -> Result<u8, String> {
    if value == "\\t" {
        return Ok(b'\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) if delimiter.is_ascii() => Ok(delimiter as u8),
        (Some(_), None) => Err(format!("delimiter {value:?} is not an ASCII character")),
        _ => Err(format!("delimiter must be a single character, got {value:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_accepts_ascii_and_tab_escape() {
        assert_eq!(parse_delimiter(","), Ok(b','));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert_eq!(parse_delimiter("\t"), Ok(b'\t'));
    }

    #[test]
    fn delimiter_rejects_non_ascii_and_multiple_characters() {
        assert!(parse_delimiter("§").unwrap_err().contains("ASCII"));
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn non_ascii_delimiter_fails_argument_parsing() {
        let result = Cli::try_parse_from(["cohort", "run", "export.csv", "--delimiter", "§"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["cohort", "run", "export.csv", "--delimiter", ";"]).unwrap();
        match cli.command {
            Command::Run(args) => assert_eq!(args.delimiter, b';'),
            _ => panic!("expected the run command"),
        }
    }
}
