use std::io::{Read, Write};

use extframe_store::{PartitionSink, PartitionSource};
use extframe_wire::{WireReader, WireWriter};
use tracing::debug;

use crate::error::Result;
use crate::export::{run_export, ExportSummary};
use crate::ingest::run_ingest;
use crate::message::RequestType;
use crate::session::IngestSummary;

/// What one connection accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ingested(IngestSummary),
    Exported(ExportSummary),
}

/// Read the envelope and run the request it names.
///
/// With `legacy_envelope` set, two reserved bytes precede the request type
/// and are discarded unread.
pub fn dispatch<R, W, S>(
    reader: &mut WireReader<R>,
    writer: &mut WireWriter<W>,
    store: &S,
    legacy_envelope: bool,
) -> Result<Outcome>
where
    R: Read,
    W: Write,
    S: PartitionSink + PartitionSource + ?Sized,
{
    if legacy_envelope {
        let reserved = reader.read_u16()?;
        debug!(reserved, "skipped legacy envelope prefix");
    }

    match RequestType::try_from(reader.read_i32()?)? {
        RequestType::CreateFrame => run_ingest(reader, store).map(Outcome::Ingested),
        RequestType::DownloadFrame => run_export(reader, writer, store).map(Outcome::Exported),
    }
}
