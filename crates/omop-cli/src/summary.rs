//! Closing summary tables printed after a run.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use omop_model::SchemaLookup;

use crate::types::RunReport;

pub fn print_summary(report: &RunReport) {
    println!("Dataset: {}", report.dataset);
    println!("Output: {}", report.output_dir.display());
    println!("Audit summary: {}", report.summary_path.display());
    println!("Persons registered: {}", report.persons);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Target table"),
        header_cell("Written"),
        header_cell("Rejected"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);

    let mut total_written = 0u64;
    let mut total_rejected = 0u64;
    for target in &report.targets {
        total_written += target.written;
        total_rejected += target.rejected;
        table.add_row(vec![
            Cell::new(&target.target)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(target.written),
            rejected_cell(target.rejected),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_written).add_attribute(Attribute::Bold),
        rejected_cell(total_rejected).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    if !report.skipped.is_empty() {
        println!();
        println!("Skipped sources:");
        for (source, reason) in &report.skipped {
            println!("- {source}: {reason}");
        }
    }
}

pub fn print_tables(schema: &SchemaLookup) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Columns"),
        header_cell("Person id"),
        header_cell("Record id"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);

    for name in schema.table_names() {
        let Some(cdm_table) = schema.table(name) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(name).fg(Color::Blue),
            Cell::new(cdm_table.columns().len()),
            optional_cell(cdm_table.person_id_column.as_deref()),
            optional_cell(cdm_table.autonumber_column.as_deref()),
        ]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn rejected_cell(count: u64) -> Cell {
    if count > 0 {
        Cell::new(count).fg(Color::Yellow)
    } else {
        dim_cell(count)
    }
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
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
