use std::fmt;
use std::io::{Read, Write};
use std::net::ToSocketAddrs;
use std::str::FromStr;

use extframe_store::{Cell, CellValue, ColumnSpec, ColumnType};
use extframe_transport::{Connection, TcpTransport};
use extframe_wire::{Message, WireConfig, WireReader, WireWriter};
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::message::{DataTag, RequestType, SubMessage, CELL_NA, CELL_PRESENT};

/// Buffered upload bytes are sent once they pass this size.
const UPLOAD_FLUSH_BYTES: usize = 64 * 1024;

/// Client-side connection settings.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub wire: WireConfig,
    /// Send two reserved bytes before the request type.
    pub legacy_envelope: bool,
}

/// One client connection. Each connection carries exactly one request.
pub struct Client {
    reader: WireReader<Connection>,
    writer: WireWriter<Connection>,
    config: ClientConfig,
}

/// Connect with the default configuration.
pub fn connect(addr: impl ToSocketAddrs) -> Result<Client> {
    connect_with_config(addr, ClientConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(addr: impl ToSocketAddrs, config: ClientConfig) -> Result<Client> {
    let conn = TcpTransport::connect(addr)?;
    conn.set_nodelay(true)?;
    let reader = WireReader::with_config_conn(conn.try_clone()?, config.wire.clone())?;
    let writer = WireWriter::with_config_conn(conn, config.wire.clone())?;
    Ok(Client {
        reader,
        writer,
        config,
    })
}

impl Client {
    /// Start a `CREATE_FRAME` request.
    pub fn upload(self) -> Result<FrameUploader<Connection>> {
        FrameUploader::new(self.writer, self.config.legacy_envelope)
    }

    /// Run a `DOWNLOAD_FRAME` request. `kinds` gives the payload type of
    /// each column, since the export stream does not describe itself.
    pub fn download(
        mut self,
        dataset: &str,
        partition: i32,
        kinds: &[ExportKind],
    ) -> Result<DownloadedPartition> {
        download_partition(
            &mut self.reader,
            &mut self.writer,
            dataset,
            partition,
            kinds,
            self.config.legacy_envelope,
        )
    }
}

fn put_envelope(msg: &mut Message, request: RequestType, legacy_envelope: bool) {
    if legacy_envelope {
        msg.put_u16(0);
    }
    msg.put_i32(request.code());
}

/// Streams one `CREATE_FRAME` request.
///
/// Sub-messages are buffered and written in batches. Nothing is published
/// server-side until [`FrameUploader::close_chunk`].
pub struct FrameUploader<W: Write> {
    writer: WireWriter<W>,
    msg: Message,
}

impl<W: Write> FrameUploader<W> {
    /// Queue the request envelope.
    pub fn new(writer: WireWriter<W>, legacy_envelope: bool) -> Result<Self> {
        let mut msg = Message::with_capacity(UPLOAD_FLUSH_BYTES);
        put_envelope(&mut msg, RequestType::CreateFrame, legacy_envelope);
        Ok(Self { writer, msg })
    }

    /// `CREATE_NEW_CHUNK` with typed columns.
    pub fn begin_chunk(&mut self, dataset: &str, columns: &[ColumnType], partition: i32) -> Result<()> {
        let codes: Vec<u8> = columns.iter().map(|c| c.code()).collect();
        self.begin_chunk_raw(dataset, &codes, partition)
    }

    /// `CREATE_NEW_CHUNK` with raw type codes, sent unchecked.
    pub fn begin_chunk_raw(&mut self, dataset: &str, type_codes: &[u8], partition: i32) -> Result<()> {
        self.msg.put_i32(SubMessage::CreateNewChunk.code());
        self.msg.put_str(dataset)?;
        self.msg.put_bytes(type_codes)?;
        self.msg.put_i32(partition);
        self.maybe_flush()
    }

    pub fn append_na(&mut self, column: i32) -> Result<()> {
        self.add_header(DataTag::Na, column);
        self.maybe_flush()
    }

    pub fn append_num(&mut self, column: i32, value: f64) -> Result<()> {
        self.add_header(DataTag::Num, column);
        self.msg.put_f64(value);
        self.maybe_flush()
    }

    pub fn append_str(&mut self, column: i32, value: &str) -> Result<()> {
        self.add_header(DataTag::Str, column);
        self.msg.put_str(value)?;
        self.maybe_flush()
    }

    pub fn append(&mut self, column: i32, value: &CellValue) -> Result<()> {
        match value {
            CellValue::Na => self.append_na(column),
            CellValue::Num(v) => self.append_num(column, *v),
            CellValue::Str(s) => self.append_str(column, s),
        }
    }

    /// Send everything queued so far.
    pub fn flush(&mut self) -> Result<()> {
        if !self.msg.is_empty() {
            self.writer.send(&self.msg)?;
            self.msg.clear();
        }
        Ok(())
    }

    /// `CLOSE_NEW_CHUNK`: flush and end the request.
    pub fn close_chunk(mut self) -> Result<WireWriter<W>> {
        self.msg.put_i32(SubMessage::CloseNewChunk.code());
        self.flush()?;
        debug!(messages = self.writer.messages_sent(), "upload closed");
        Ok(self.writer)
    }

    fn add_header(&mut self, tag: DataTag, column: i32) {
        self.msg
            .put_i32(SubMessage::AddToFrame.code())
            .put_i32(tag.code())
            .put_i32(column);
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.msg.len() >= UPLOAD_FLUSH_BYTES {
            self.flush()?;
        }
        Ok(())
    }
}

/// Payload type the client expects for an exported column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Str,
    Int,
    Real,
}

impl ExportKind {
    /// Payload a column of `spec` exports with.
    ///
    /// All-NA columns never carry a payload; they map to `Str`.
    pub fn for_column(spec: &ColumnSpec) -> Self {
        match spec.column_type {
            _ if spec.is_integral() => ExportKind::Int,
            ColumnType::Numeric => ExportKind::Real,
            _ => ExportKind::Str,
        }
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Ok(ExportKind::Str),
            "int" | "long" | "i64" => Ok(ExportKind::Int),
            "real" | "double" | "f64" => Ok(ExportKind::Real),
            other => Err(format!("unknown column kind '{other}' (expected str, int or real)")),
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportKind::Str => "str",
            ExportKind::Int => "int",
            ExportKind::Real => "real",
        })
    }
}

/// Cells of one downloaded partition, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedPartition {
    pub rows: usize,
    pub cells: Vec<Vec<Cell>>,
}

/// Send a `DOWNLOAD_FRAME` request and read the full response.
pub fn download_partition<R, W>(
    reader: &mut WireReader<R>,
    writer: &mut WireWriter<W>,
    dataset: &str,
    partition: i32,
    kinds: &[ExportKind],
    legacy_envelope: bool,
) -> Result<DownloadedPartition>
where
    R: Read,
    W: Write,
{
    let mut msg = Message::new();
    put_envelope(&mut msg, RequestType::DownloadFrame, legacy_envelope);
    msg.put_str(dataset)?;
    msg.put_i32(partition);
    writer.send(&msg)?;

    let header = reader.read_i32()?;
    let rows = usize::try_from(header).map_err(|_| ProtocolError::InvalidRowCount(header))?;
    debug!(dataset, partition, rows, "download header");

    let mut cells = Vec::with_capacity(rows.min(4096));
    for _ in 0..rows {
        let row = kinds
            .iter()
            .map(|kind| read_cell(reader, *kind))
            .collect::<Result<Vec<_>>>()?;
        cells.push(row);
    }
    Ok(DownloadedPartition { rows, cells })
}

fn read_cell<R: Read>(reader: &mut WireReader<R>, kind: ExportKind) -> Result<Cell> {
    match reader.read_i32()? {
        CELL_NA => Ok(Cell::Null),
        CELL_PRESENT => Ok(match kind {
            ExportKind::Str => Cell::Str(reader.read_str()?),
            ExportKind::Int => Cell::Int(reader.read_i64()?),
            ExportKind::Real => Cell::Real(reader.read_f64()?),
        }),
        other => Err(ProtocolError::InvalidNullFlag(other)),
    }
}
