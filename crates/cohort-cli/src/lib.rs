//! CLI library components for the cohort timeline builder.

pub mod commands;
pub mod logging;
pub mod summary;
pub mod types;
