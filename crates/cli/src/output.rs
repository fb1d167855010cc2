//! Output formatting for the CLI.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::{self, Write};

use clap::ValueEnum;
use repair_desk_core::Record;
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: failed to encode output: {e}"),
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{message}"),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({"status": "success", "message": message})
            );
        }
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {message}"),
        OutputFormat::Json => {
            eprintln!(
                "{}",
                serde_json::json!({"status": "error", "message": message})
            );
        }
    }
}

/// Print one record: pretty JSON in both formats.
pub fn print_record(record: &Record) {
    print_json(record);
}

/// Print a page of records.
pub fn print_records(records: &[Record], total: Option<u64>, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            for record in records {
                let id = record
                    .id()
                    .map_or_else(|| "-".to_string(), |id| id.to_string());
                let fields = serde_json::Value::Object(record.as_map().clone());
                println!("{id:<28} {fields}");
            }
            match total {
                Some(total) => println!("\n{} of {total} record(s)", records.len()),
                None => println!("\n{} record(s)", records.len()),
            }
        }
        OutputFormat::Json => match total {
            Some(total) => print_json(&serde_json::json!({"data": records, "total": total})),
            None => print_json(&serde_json::json!({"data": records})),
        },
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {value}", format!("{label}:"));
}

/// Print a heading.
pub fn print_heading(text: &str) {
    println!("\n{text}");
    println!("{}", "-".repeat(50));
}

/// Prompt on stdout and read one trimmed line from stdin.
pub fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
