use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use extframe_protocol::{DownloadedPartition, ExportKind};
use extframe_store::Cell;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ListeningOutput<'a> {
    event: &'static str,
    addr: &'a str,
    legacy_envelope: bool,
}

/// Announce the bound address. Flushed so a parent process can read it.
pub fn print_listening(addr: &str, legacy_envelope: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ListeningOutput {
            event: "listening",
            addr,
            legacy_envelope,
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!("listening on {addr}"),
    }
    let _ = std::io::stdout().flush();
}

#[derive(Serialize)]
pub struct UploadReport {
    pub dataset: String,
    pub partition: i32,
    pub columns: Vec<String>,
    pub rows: usize,
    pub cells: usize,
}

pub fn print_upload(report: &UploadReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DATASET", "PARTITION", "COLUMNS", "ROWS", "CELLS"])
                .add_row(vec![
                    report.dataset.clone(),
                    report.partition.to_string(),
                    report.columns.join(","),
                    report.rows.to_string(),
                    report.cells.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "uploaded dataset={} partition={} columns={} rows={} cells={}",
            report.dataset,
            report.partition,
            report.columns.join(","),
            report.rows,
            report.cells
        ),
    }
}

#[derive(Serialize)]
struct RowOutput<'a> {
    dataset: &'a str,
    partition: i32,
    row: usize,
    cells: Vec<Value>,
}

/// Print a downloaded partition. JSON output is one line per row.
pub fn print_partition(
    dataset: &str,
    partition: i32,
    kinds: &[ExportKind],
    data: &DownloadedPartition,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            for (row, cells) in data.cells.iter().enumerate() {
                print_json(&RowOutput {
                    dataset,
                    partition,
                    row,
                    cells: cells.iter().map(cell_to_json).collect(),
                });
            }
        }
        OutputFormat::Table => {
            let mut header = vec!["ROW".to_string()];
            header.extend(
                kinds
                    .iter()
                    .enumerate()
                    .map(|(i, kind)| format!("C{} ({kind})", i + 1)),
            );

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header);
            for (row, cells) in data.cells.iter().enumerate() {
                let mut line = vec![row.to_string()];
                line.extend(cells.iter().map(Cell::to_string));
                table.add_row(line);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{dataset}/{partition}: {} rows", data.rows);
            for (row, cells) in data.cells.iter().enumerate() {
                let line: Vec<String> = cells.iter().map(Cell::to_string).collect();
                println!("  [{row}] {}", line.join(" | "));
            }
        }
    }
}

pub fn cell_to_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Int(v) => Value::from(*v),
        Cell::Real(v) => serde_json::Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Cell::Str(s) => Value::String(s.clone()),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
