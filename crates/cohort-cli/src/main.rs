//! Cohort timeline builder CLI.

use clap::{ColorChoice, Parser};
use cohort_cli::commands::{RunOptions, load_config, run_cohort, run_patient};
use cohort_cli::logging::{LogConfig, LogFormat, init_logging};
use cohort_cli::summary::{print_patient, print_run_summary, timepoint_table};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match cli.command {
        Command::Run(args) => {
            let options = RunOptions {
                export: args.export,
                config: args.config.config,
                output_dir: args.output_dir,
                delimiter: args.delimiter,
                dry_run: args.dry_run,
            };
            match run_cohort(&options) {
                Ok(result) => {
                    print_run_summary(&result);
                    0
                }
                Err(error) => {
                    eprintln!("error: {error:#}");
                    1
                }
            }
        }
        Command::Patient(args) => match run_patient(
            &args.export,
            &args.id,
            args.config.config.as_deref(),
            args.delimiter,
        ) {
            Ok(patient) if args.json => match serde_json::to_string_pretty(&patient) {
                Ok(json) => {
                    println!("{json}");
                    0
                }
                Err(error) => {
                    eprintln!("error: {error}");
                    1
                }
            },
            Ok(patient) => {
                print_patient(&patient);
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Timepoints(args) => match load_config(args.config.as_deref()) {
            Ok(config) => {
                println!("{}", timepoint_table(&config));
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
