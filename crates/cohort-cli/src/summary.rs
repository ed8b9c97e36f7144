use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cohort_core::ReviewReport;
use cohort_model::{LabMetric, Patient, TimepointStage, yes_no};
use cohort_standards::StudyConfig;

use crate::types::{CohortCounts, RunResult};

/// Examples shown per review category.
const MAX_EXAMPLES: usize = 5;

pub fn print_run_summary(result: &RunResult) {
    println!("Export: {}", result.source);
    match &result.outputs {
        Some(outputs) => {
            println!("Output: {}", outputs.dir.display());
            println!("  {}", outputs.demographics.display());
            println!("  {}", outputs.observations.display());
        }
        None => println!("Output: (dry run)"),
    }
    println!("{}", counts_table(&CohortCounts::from_cohort(&result.cohort)));
    if let Some(table) = review_table(result.cohort.review()) {
        println!();
        println!("Review:");
        println!("{table}");
    }
}

pub fn counts_table(counts: &CohortCounts) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Measure"), header_cell("Count")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let rows = [
        ("Patients", counts.patients, None),
        ("Observations", counts.observations, None),
        ("With VTE", counts.with_vte, None),
        ("Deaths", counts.deaths, None),
        ("Withdrawn", counts.withdrawn, None),
        ("Excluded", counts.excluded, None),
        ("Not enrolled", counts.not_enrolled, None),
        ("Review issues", counts.review_issues, Some(Color::Yellow)),
    ];
    for (label, count, color) in rows {
        table.add_row(vec![Cell::new(label), count_cell(count, color)]);
    }
    table
}

/// Review findings grouped by category, or `None` when there is nothing to review.
pub fn review_table(review: &ReviewReport) -> Option<Table> {
    let mut rows: Vec<(&str, usize, String)> = Vec::new();
    if !review.unknown_columns.is_empty() {
        rows.push((
            "Unknown columns",
            review.unknown_columns.len(),
            examples(review.unknown_columns.iter().map(String::as_str)),
        ));
    }
    if !review.shadowed_columns.is_empty() {
        rows.push((
            "Shadowed columns",
            review.shadowed_columns.len(),
            examples(review.shadowed_columns.iter().map(|shadowed| {
                format!("{} ({} kept {})", shadowed.column, shadowed.field, shadowed.kept)
            })),
        ));
    }
    if !review.timepoint_collisions.is_empty() {
        rows.push((
            "Timepoint collisions",
            review.timepoint_collisions.len(),
            examples(review.timepoint_collisions.iter().map(|collision| {
                format!("{} ({} over {})", collision.variant, collision.kept, collision.ignored)
            })),
        ));
    }
    if !review.unresolved_timepoints.is_empty() {
        rows.push((
            "Unresolved timepoints",
            review.unresolved_timepoints.values().sum(),
            examples(
                review
                    .unresolved_timepoints
                    .iter()
                    .map(|(label, count)| format!("{label} x{count}")),
            ),
        ));
    }
    if !review.unparseable_values.is_empty() {
        rows.push((
            "Unparseable values",
            review.unparseable_values.len(),
            examples(
                review
                    .unparseable_values
                    .iter()
                    .map(|value| format!("{}={}", value.field, value.value)),
            ),
        ));
    }
    if review.unidentified_rows > 0 {
        rows.push(("Unidentified rows", review.unidentified_rows, "-".to_string()));
    }
    if rows.is_empty() {
        return None;
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Finding"),
        header_cell("Count"),
        header_cell("Examples"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (finding, count, examples) in rows {
        table.add_row(vec![
            Cell::new(finding),
            count_cell(count, Some(Color::Yellow)),
            example_cell(examples),
        ]);
    }
    Some(table)
}

pub fn timepoint_table(config: &StudyConfig) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rank"),
        header_cell("Stage"),
        header_cell("Variants"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for stage in TimepointStage::ALL {
        let rank = match stage.rank() {
            Some(rank) => Cell::new(rank),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            rank,
            stage_cell(stage),
            Cell::new(config.timepoints.variants(stage).len()),
        ]);
    }
    table
}

pub fn print_patient(patient: &Patient) {
    println!("Patient: {}", patient.id());
    println!("Study: {}", patient.study().unwrap_or("-"));
    println!(
        "Injury to surgery: {}",
        hours_text(patient.injury_to_surgery_hours())
    );
    let demographics = demographics_text(patient);
    if !demographics.is_empty() {
        println!("{demographics}");
    }
    let outcomes = patient.outcomes();
    println!(
        "VTE: {} ({})  Death: {}  Withdrawn: {}",
        yes_no(outcomes.has_vte()),
        outcomes
            .thrombosis
            .map_or("-", |category| category.name()),
        yes_no(outcomes.death),
        yes_no(outcomes.withdrawn),
    );
    println!("{}", observation_table(patient));
}

/// Recorded demographic fields as `name: value` pairs on one line.
pub fn demographics_text(patient: &Patient) -> String {
    patient
        .demographics()
        .iter()
        .map(|(field, value)| format!("{field}: {value}"))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn observation_table(patient: &Patient) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Timepoint"),
        header_cell("Panel draw"),
        header_cell("Lab draw"),
        header_cell("Injury→lab (h)"),
        header_cell("Surgery→panel (h)"),
        header_cell("Hgb"),
        header_cell("Metrics"),
    ]);
    apply_table_style(&mut table);
    for column in 3..7 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for observation in patient.observations() {
        let timepoint = match observation.timepoint() {
            Some(label) if label.is_resolved() => Cell::new(label.as_str()),
            Some(label) => Cell::new(label.as_str()).fg(Color::Yellow),
            None => dim_cell("-"),
        };
        let draw = |value: Option<chrono::NaiveDateTime>| match value {
            Some(value) => Cell::new(value.format("%Y-%m-%d %H:%M")),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            timepoint,
            draw(observation.draw_times().panel),
            draw(observation.draw_times().lab),
            Cell::new(hours_text(observation.offsets().injury_to_lab)),
            Cell::new(hours_text(observation.offsets().surgery_to_panel)),
            Cell::new(
                observation
                    .metric(LabMetric::Hemoglobin)
                    .map_or_else(|| "-".to_string(), |value| format!("{value}")),
            ),
            Cell::new(observation.metrics().count()),
        ]);
    }
    table
}

fn hours_text(hours: Option<f64>) -> String {
    hours.map_or_else(|| "-".to_string(), |hours| format!("{hours:.1}"))
}

fn examples<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut values = values.into_iter();
    let mut shown: Vec<String> = values
        .by_ref()
        .take(MAX_EXAMPLES)
        .map(|value| value.as_ref().to_string())
        .collect();
    let rest = values.count();
    if rest > 0 {
        shown.push(format!("+{rest} more"));
    }
    shown.join(", ")
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn stage_cell(stage: TimepointStage) -> Cell {
    if stage.rank().is_some() {
        Cell::new(stage.name())
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new(stage.name()).fg(Color::DarkGrey)
    }
}

fn count_cell(count: usize, color: Option<Color>) -> Cell {
    match color {
        Some(color) if count > 0 => Cell::new(count).fg(color).add_attribute(Attribute::Bold),
        _ if count == 0 => dim_cell(count),
        _ => Cell::new(count),
    }
}

fn example_cell(value: String) -> Cell {
    if value == "-" {
        dim_cell(value)
    } else {
        Cell::new(value)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn examples_are_capped() {
        let values = ["a", "b", "c", "d", "e", "f", "g"];
        assert_eq!(examples(values), "a, b, c, d, e, +2 more");
        assert_eq!(examples(["x"]), "x");
    }

    #[test]
    fn clean_review_has_no_table() {
        assert!(review_table(&ReviewReport::default()).is_none());
    }

    #[test]
    fn demographics_are_listed_in_field_order() {
        use cohort_model::{
            Anchors, CanonicalField, Demographics, Outcomes, PatientId, PatientParts,
        };
        use std::collections::BTreeMap;

        let patient = Patient::from_parts(PatientParts {
            id: PatientId::new("TH-001").unwrap(),
            demographics: Demographics::new(BTreeMap::from([
                (CanonicalField::Treatment, "Fixation".to_string()),
                (CanonicalField::Age, "71".to_string()),
            ])),
            observations: Vec::new(),
            outcomes: Outcomes::default(),
            anchors: Anchors::default(),
            study: None,
            pre_op_medication: None,
        });
        assert_eq!(demographics_text(&patient), "Age: 71  Treatment: Fixation");
    }

    #[test]
    fn hours_are_rounded_or_dashed() {
        assert_eq!(hours_text(Some(30.04)), "30.0");
        assert_eq!(hours_text(None), "-");
    }
}
