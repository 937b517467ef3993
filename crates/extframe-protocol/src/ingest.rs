use std::io::Read;

use extframe_store::{CellValue, PartitionSink};
use extframe_wire::WireReader;
use tracing::debug;

use crate::error::Result;
use crate::message::{DataTag, SubMessage};
use crate::session::{IngestSession, IngestSummary};

/// Drive a `CREATE_FRAME` request to completion.
///
/// Reads sub-messages until `CLOSE_NEW_CHUNK` seals the active builder set.
/// Any error, including the connection dropping, returns early and the
/// unsealed builder set is discarded with the session.
pub fn run_ingest<R, S>(reader: &mut WireReader<R>, sink: &S) -> Result<IngestSummary>
where
    R: Read,
    S: PartitionSink + ?Sized,
{
    let mut session = IngestSession::new(sink);

    loop {
        let message = SubMessage::try_from(reader.read_i32()?)?;
        match message {
            SubMessage::CreateNewChunk => {
                let dataset = reader.read_str()?;
                let type_codes = reader.read_bytes()?;
                let partition = reader.read_i32()?;
                debug!(%dataset, partition, columns = type_codes.len(), "CREATE_NEW_CHUNK");
                session.begin_chunk(&dataset, &type_codes, partition)?;
            }
            SubMessage::AddToFrame => {
                let tag = DataTag::try_from(reader.read_i32()?)?;
                let column = reader.read_i32()?;
                let value = read_value(reader, tag)?;
                session.append(column, value)?;
            }
            SubMessage::CloseNewChunk => {
                debug!("CLOSE_NEW_CHUNK");
                return session.close();
            }
        }
    }
}

fn read_value<R: Read>(reader: &mut WireReader<R>, tag: DataTag) -> Result<CellValue> {
    let value = match tag {
        DataTag::Na => CellValue::Na,
        DataTag::Num => CellValue::Num(reader.read_f64()?),
        DataTag::Str => match reader.read_opt_str()? {
            Some(s) => CellValue::Str(s),
            None => CellValue::Na,
        },
    };
    Ok(value)
}
