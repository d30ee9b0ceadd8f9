//! Output formatting utilities

use comfy_table::{Cell, Table};
use serde::Serialize;
use std::collections::BTreeSet;
use tinynet_core::{Record, Value};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

pub fn to_json<T: Serialize>(data: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Table with a header row, one row per entry of `rows`
pub fn simple_table(headers: &[&str], rows: &[Vec<String>]) -> Table {
    let mut table = Table::new();
    table.set_header(headers.iter().map(|h| Cell::new(h)).collect::<Vec<Cell>>());
    for row in rows {
        table.add_row(row.iter().map(Cell::new).collect::<Vec<Cell>>());
    }
    table
}

/// Table of records, one column per attribute seen on any of them
pub fn records_table(records: &[&Record]) -> Table {
    let attributes: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.fields().keys().map(String::as_str))
        .collect();

    let mut table = Table::new();
    table.set_header(attributes.iter().map(|a| Cell::new(a)).collect::<Vec<Cell>>());
    for record in records {
        let cells: Vec<Cell> = attributes
            .iter()
            .map(|a| Cell::new(record.get(a).map(format_value).unwrap_or_default()))
            .collect();
        table.add_row(cells);
    }
    table
}
