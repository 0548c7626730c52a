//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn print_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Yaml => match serde_yaml::to_string(value) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => print_error(&format!("YAML output failed: {}", e)),
        },
        _ => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => print_error(&format!("JSON output failed: {}", e)),
        },
    }
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = table();
            table.set_header(T::headers());
            table.add_row(item.row());
            println!("{table}");
        }
        OutputFormat::Json | OutputFormat::Yaml => print_structured(item, format),
        OutputFormat::Plain => {
            for (header, value) in T::headers().iter().zip(item.row()) {
                println!("{}: {}", header, value);
            }
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() && matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = table();
            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            println!("{table}");
        }
        OutputFormat::Json | OutputFormat::Yaml => print_structured(items, format),
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                for (header, value) in T::headers().iter().zip(item.row()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print an arbitrary document (API payloads, reports). Table and plain
/// output fall back to pretty JSON.
pub fn print_document<T: Serialize + ?Sized>(value: &T, format: OutputFormat) {
    print_structured(value, format);
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

/// Section header
pub fn print_banner(title: &str) {
    println!("{}", "━".repeat(60).dimmed());
    println!(" {}", title.bold());
    println!("{}", "━".repeat(60).dimmed());
}
