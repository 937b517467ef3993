use std::io::{Read, Write};

use extframe_store::{Cell, PartitionId, PartitionSource};
use extframe_wire::{Message, WireReader, WireWriter};
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::message::{CELL_NA, CELL_PRESENT};

/// Result of a completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub dataset: String,
    pub partition: PartitionId,
    pub rows: usize,
    pub cells: u64,
}

/// Serve a `DOWNLOAD_FRAME` request.
///
/// Writes a `rowCount` header, then one message per cell in row-major,
/// column-minor order. Each cell is its own write to the connection.
pub fn run_export<R, W, S>(
    reader: &mut WireReader<R>,
    writer: &mut WireWriter<W>,
    source: &S,
) -> Result<ExportSummary>
where
    R: Read,
    W: Write,
    S: PartitionSource + ?Sized,
{
    let dataset = reader.read_str()?;
    let raw_partition = reader.read_i32()?;
    let partition = PartitionId::try_from(raw_partition)
        .map_err(|_| ProtocolError::InvalidPartition(raw_partition))?;
    debug!(%dataset, partition, "DOWNLOAD_FRAME");

    let view = source.resolve(&dataset)?;
    let columns = view.columns().len();
    let rows = view.partition_row_count(partition)?;
    let header = i32::try_from(rows).map_err(|_| ProtocolError::TooManyRows(rows))?;

    let mut msg = Message::with_capacity(64);
    msg.put_i32(header);
    writer.send(&msg)?;

    let mut cells = 0u64;
    for row in 0..rows {
        for column in 0..columns {
            msg.clear();
            encode_cell(&mut msg, view.read_cell(partition, column, row)?)?;
            writer.send(&msg)?;
            cells += 1;
        }
    }

    Ok(ExportSummary {
        dataset,
        partition,
        rows,
        cells,
    })
}

/// Encode one exported cell: null flag, then the payload if present.
pub fn encode_cell(msg: &mut Message, cell: Cell) -> Result<()> {
    match cell {
        Cell::Null => {
            msg.put_i32(CELL_NA);
        }
        Cell::Int(v) => {
            msg.put_i32(CELL_PRESENT).put_i64(v);
        }
        Cell::Real(v) => {
            msg.put_i32(CELL_PRESENT).put_f64(v);
        }
        Cell::Str(s) => {
            msg.put_i32(CELL_PRESENT).put_str(&s)?;
        }
    }
    Ok(())
}
