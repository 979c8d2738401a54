use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use ssa_model::ValidationResult;
use ssa_report::{GroupReport, ReportPayload, SampleReport};
use ssa_standards::AnalysisStandard;

/// Properties of one analysed sample with their expanded uncertainties.
pub fn print_sample(report: &SampleReport) {
    println!("Sample: {} ({})", report.name, report.id);
    println!(
        "Standard: {}@{} [{}]",
        report.standard.name,
        report.standard.version,
        short_fingerprint(&report.standard.fingerprint)
    );
    let lineage: Vec<String> = report.lineage.iter().map(ToString::to_string).collect();
    println!("Lineage: {}", lineage.join(" -> "));
    if !report.excluded.is_empty() {
        println!("Excluded points: {}", report.excluded.len());
    }
    if let Some(validation) = &report.validation {
        print_validation(validation);
    }
    if report.properties.is_empty() {
        println!("No mechanical properties (specimen geometry missing).");
        return;
    }

    let k = report.standard.coverage_factor;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Property"),
        header_cell("Value"),
        header_cell(&format!("U (k={k})")),
        header_cell("Unit"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for property in &report.properties {
        table.add_row(vec![
            Cell::new(&property.name),
            Cell::new(format_value(property.display_value)),
            dim_cell(format_value(property.display_uncertainty * k)),
            Cell::new(&property.display_unit),
        ]);
    }
    println!("{table}");
}

fn print_validation(result: &ValidationResult) {
    if result.passed {
        println!("Validation: passed");
    } else {
        println!("{}", ssa_validate::render_summary(result));
    }
}

/// One row per sample, then the group aggregates.
pub fn print_batch(payload: &ReportPayload, failures: &[(String, String)]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Sample"),
        header_cell("Id"),
        header_cell("Points"),
        header_cell("Excluded"),
        header_cell("Valid"),
        header_cell("Modulus"),
        header_cell("Ultimate"),
    ]);
    apply_summary_style(&mut table);
    for column in 2..=6 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for report in &payload.samples {
        let property = |name: &str| {
            report.property(name).map_or_else(
                || dim_cell("-"),
                |p| Cell::new(format!("{} {}", format_value(p.display_value), p.display_unit)),
            )
        };
        table.add_row(vec![
            Cell::new(&report.name).add_attribute(Attribute::Bold),
            Cell::new(report.id),
            Cell::new(report.points),
            count_cell(report.excluded.len(), Color::Yellow),
            validity_cell(report.validation.as_ref()),
            property("modulus"),
            property("ultimate_strength"),
        ]);
    }
    println!("{table}");

    for group in &payload.groups {
        print_group(group);
    }
    if !failures.is_empty() {
        eprintln!("Failed:");
        for (source, error) in failures {
            eprintln!("- {source}: {error}");
        }
    }
}

fn print_group(group: &GroupReport) {
    if group.aggregates.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Property"),
        header_cell("n"),
        header_cell("Mean"),
        header_cell("Std dev"),
        header_cell("u(mean)"),
        header_cell("Unit"),
    ]);
    apply_table_style(&mut table);
    for column in 1..=4 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for value in &group.aggregates {
        table.add_row(vec![
            Cell::new(&value.name),
            Cell::new(value.n),
            Cell::new(format_value(value.mean)),
            value
                .std_dev
                .map_or_else(|| dim_cell("-"), |sd| Cell::new(format_value(sd))),
            Cell::new(format_value(value.combined_uncertainty)),
            Cell::new(&value.unit),
        ]);
    }
    println!();
    println!("Group {} ({}):", group.name, group.role);
    println!("{table}");
}

pub fn print_standards<'a>(standards: impl IntoIterator<Item = &'a AnalysisStandard>) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Standard"),
        header_cell("Title"),
        header_cell("Fields"),
        header_cell("Fingerprint"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for standard in standards {
        table.add_row(vec![
            Cell::new(standard.key())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(standard.title()),
            Cell::new(standard.fields().len()),
            dim_cell(short_fingerprint(standard.fingerprint())),
        ]);
    }
    println!("{table}");
}

pub fn print_standard(standard: &AnalysisStandard) {
    println!("Standard: {}", standard.key());
    println!("Title: {}", standard.title());
    println!("Fingerprint: {}", standard.fingerprint());
    println!(
        "Propagation: {} (k={})",
        standard.propagation().rules_version,
        standard.propagation().coverage_factor
    );
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Kind"),
        header_cell("Required"),
        header_cell("Rule"),
    ]);
    apply_table_style(&mut table);
    for rule in standard.fields() {
        let tolerance = rule
            .tolerance()
            .map_or_else(|| "-".to_string(), |t| t.describe(&rule.name));
        table.add_row(vec![
            Cell::new(&rule.name),
            Cell::new(rule.kind.as_str()),
            Cell::new(match (rule.required, rule.satisfied_by.is_empty()) {
                (false, _) => "no".to_string(),
                (true, true) => "yes".to_string(),
                (true, false) => format!("unless {}", rule.satisfied_by.join(" + ")),
            }),
            Cell::new(tolerance),
        ]);
    }
    println!("{table}");
}

fn format_value(value: f64) -> String {
    if value != 0.0 && (value.abs() >= 1e5 || value.abs() < 1e-3) {
        format!("{value:.4e}")
    } else {
        format!("{value:.4}")
    }
}

fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn validity_cell(result: Option<&ValidationResult>) -> Cell {
    match result {
        Some(result) if result.passed => Cell::new("✓").fg(Color::Green),
        Some(result) => Cell::new(format!("✗ {}", result.violations.len()))
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
