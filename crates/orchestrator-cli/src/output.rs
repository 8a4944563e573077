//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One labelled value in a key/value table.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct Row {
    /// Label
    #[tabled(rename = "Field")]
    pub field: String,
    /// Rendered value
    #[tabled(rename = "Value")]
    pub value: String,
}

impl Row {
    /// Build a row from anything displayable.
    pub fn new(field: &str, value: impl std::fmt::Display) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Print a list of items as a table
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("No results found.");
    } else {
        println!("{}", Table::new(items));
    }
}

/// Print `item` as JSON, or `rows` as a table
pub fn print_item<T: Serialize>(item: &T, rows: &[Row], format: OutputFormat) {
    match format {
        OutputFormat::Table => print_table(rows),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}
