//! Styled terminal output for the demo.

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use pgrecord::Record;

pub fn print_header(title: &str) {
    println!();
    println!("{}", "─".repeat(70).bright_black());
    println!("{}", title.bold().cyan());
    println!("{}", "─".repeat(70).bright_black());
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("  {} {}", "ℹ".blue(), msg);
}

/// Render records as a table, one column per table column.
pub fn print_records(records: &[Record]) {
    let Some(first) = records.first() else {
        print_info("no records");
        return;
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            first
                .columns()
                .names()
                .map(|n| Cell::new(n).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    for record in records {
        table.add_row(
            record
                .columns()
                .iter()
                .map(|(_, v)| Cell::new(v.to_string()))
                .collect::<Vec<_>>(),
        );
    }
    println!("{table}");
}
