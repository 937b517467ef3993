use std::time::Duration;

use extframe_protocol::{connect_with_config, ClientConfig};
use extframe_store::{CellValue, ColumnType};
use extframe_wire::WireConfig;
use serde::Deserialize;
use serde_json::Value;

use crate::cmd::{parse_duration, UploadArgs};
use crate::exit::{io_error, protocol_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_upload, OutputFormat, UploadReport};

#[derive(Deserialize, Debug)]
struct RowsFile {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// A validated rows file, ready to stream.
#[derive(Debug, PartialEq)]
struct Upload {
    columns: Vec<ColumnType>,
    rows: Vec<Vec<CellValue>>,
}

pub fn run(args: UploadArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let text = std::fs::read_to_string(&args.file)
        .map_err(|err| io_error(&format!("cannot read {}", args.file.display()), err))?;
    let upload = parse_rows(&text)?;

    let config = client_config(timeout, args.legacy_envelope);
    let client = connect_with_config(args.addr.as_str(), config)
        .map_err(|err| protocol_error("connect failed", err))?;

    let send = |err| protocol_error("upload failed", err);
    let mut uploader = client.upload().map_err(send)?;
    uploader
        .begin_chunk(&args.dataset, &upload.columns, args.partition)
        .map_err(send)?;
    let mut cells = 0usize;
    for row in &upload.rows {
        for (column, value) in row.iter().enumerate() {
            let column = i32::try_from(column)
                .map_err(|_| CliError::new(DATA_INVALID, "too many columns"))?;
            uploader.append(column, value).map_err(send)?;
            cells += 1;
        }
    }
    uploader.close_chunk().map_err(send)?;

    print_upload(
        &UploadReport {
            dataset: args.dataset,
            partition: args.partition,
            columns: upload.columns.iter().map(|c| c.name().to_string()).collect(),
            rows: upload.rows.len(),
            cells,
        },
        format,
    );
    Ok(SUCCESS)
}

pub(crate) fn client_config(timeout: Duration, legacy_envelope: bool) -> ClientConfig {
    ClientConfig {
        wire: WireConfig {
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
            ..WireConfig::default()
        },
        legacy_envelope,
    }
}

fn parse_rows(text: &str) -> CliResult<Upload> {
    let file: RowsFile = serde_json::from_str(text)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid rows file: {err}")))?;

    let columns = file
        .columns
        .iter()
        .map(|name| {
            name.parse::<ColumnType>()
                .map_err(|err| CliError::new(DATA_INVALID, format!("invalid rows file: {err}")))
        })
        .collect::<CliResult<Vec<_>>>()?;

    let rows = file
        .rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != columns.len() {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!(
                        "row {index} has {} values, expected {}",
                        row.len(),
                        columns.len()
                    ),
                ));
            }
            row.into_iter()
                .map(|value| to_cell_value(index, value))
                .collect::<CliResult<Vec<_>>>()
        })
        .collect::<CliResult<Vec<_>>>()?;

    Ok(Upload { columns, rows })
}

fn to_cell_value(row: usize, value: Value) -> CliResult<CellValue> {
    match value {
        Value::Null => Ok(CellValue::Na),
        Value::Number(n) => n.as_f64().map(CellValue::Num).ok_or_else(|| {
            CliError::new(DATA_INVALID, format!("row {row}: number {n} out of range"))
        }),
        Value::String(s) => Ok(CellValue::Str(s)),
        other => Err(CliError::new(
            DATA_INVALID,
            format!("row {row}: unsupported value {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_file() {
        let upload = parse_rows(
            r#"{"columns": ["num", "str"], "rows": [[1.5, "x"], [null, "y"]]}"#,
        )
        .unwrap();
        assert_eq!(
            upload,
            Upload {
                columns: vec![ColumnType::Numeric, ColumnType::String],
                rows: vec![
                    vec![CellValue::Num(1.5), CellValue::Str("x".into())],
                    vec![CellValue::Na, CellValue::Str("y".into())],
                ],
            }
        );
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_rows(r#"{"columns": ["num", "str"], "rows": [[1]]}"#).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("row 0 has 1 values"));
    }

    #[test]
    fn rejects_unknown_column_type() {
        let err = parse_rows(r#"{"columns": ["blob"], "rows": []}"#).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn rejects_nested_values() {
        let err = parse_rows(r#"{"columns": ["str"], "rows": [[[1]]]}"#).unwrap_err();
        assert!(err.message.contains("unsupported value"));
    }
}
