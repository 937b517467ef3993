use std::fmt;

use extframe_store::{BuilderSet, CellValue, ColumnType, PartitionId, PartitionSink};
use tracing::{debug, warn};

use crate::error::{ProtocolError, Result};
use crate::message::SubMessage;

/// State of an [`IngestSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No active builder set.
    Idle,
    /// One builder set is active.
    Building,
    /// The builder set was sealed; the session is over.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "IDLE",
            SessionState::Building => "BUILDING",
            SessionState::Closed => "CLOSED",
        })
    }
}

/// Result of a completed ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub dataset: String,
    pub partition: PartitionId,
    pub rows: usize,
    pub columns: usize,
    /// `ADD_TO_FRAME` messages applied to the sealed set.
    pub appends: u64,
}

/// Per-connection ingest state machine.
///
/// Holds at most one active builder set. The set is published only by
/// [`IngestSession::close`]; dropping the session in any other state
/// discards it unsealed.
pub struct IngestSession<'a, S: PartitionSink + ?Sized> {
    sink: &'a S,
    active: Option<Box<dyn BuilderSet>>,
    closed: bool,
    appends: u64,
}

impl<'a, S: PartitionSink + ?Sized> IngestSession<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self {
            sink,
            active: None,
            closed: false,
            appends: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Closed
        } else if self.active.is_some() {
            SessionState::Building
        } else {
            SessionState::Idle
        }
    }

    /// Handle `CREATE_NEW_CHUNK`.
    ///
    /// A builder set that is already active is abandoned, never sealed.
    pub fn begin_chunk(&mut self, dataset: &str, type_codes: &[u8], partition: i32) -> Result<()> {
        self.expect_open(SubMessage::CreateNewChunk)?;

        let partition =
            PartitionId::try_from(partition).map_err(|_| ProtocolError::InvalidPartition(partition))?;
        let column_types = type_codes
            .iter()
            .enumerate()
            .map(|(column, code)| {
                ColumnType::from_code(*code).ok_or(ProtocolError::UnknownColumnType {
                    column,
                    code: *code,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(abandoned) = self.active.take() {
            warn!(
                dataset = abandoned.dataset(),
                partition = abandoned.partition(),
                appends = self.appends,
                "abandoning unsealed builder set"
            );
        }
        self.appends = 0;

        let set = self.sink.allocate(dataset, &column_types, partition)?;
        debug!(
            dataset,
            partition,
            columns = column_types.len(),
            "builder set active"
        );
        self.active = Some(set);
        Ok(())
    }

    /// Handle `ADD_TO_FRAME`.
    pub fn append(&mut self, column: i32, value: CellValue) -> Result<()> {
        let state = self.state();
        let set = match (state, self.active.as_mut()) {
            (SessionState::Building, Some(set)) => set,
            _ => {
                return Err(ProtocolError::UnexpectedMessage {
                    message: SubMessage::AddToFrame,
                    state,
                })
            }
        };

        let columns = set.len();
        let index = usize::try_from(column)
            .ok()
            .filter(|index| *index < columns)
            .ok_or(ProtocolError::ColumnOutOfRange { column, columns })?;

        set.append(index, value)?;
        self.appends += 1;
        Ok(())
    }

    /// Handle `CLOSE_NEW_CHUNK`: seal and publish the active builder set.
    pub fn close(&mut self) -> Result<IngestSummary> {
        let state = self.state();
        let set = match self.active.take() {
            Some(set) if !self.closed => set,
            _ => {
                return Err(ProtocolError::UnexpectedMessage {
                    message: SubMessage::CloseNewChunk,
                    state,
                })
            }
        };
        self.closed = true;

        let dataset = set.dataset().to_string();
        let partition = set.partition();
        let columns = set.len();
        let rows = set.seal()?;

        Ok(IngestSummary {
            dataset,
            partition,
            rows,
            columns,
            appends: self.appends,
        })
    }

    fn expect_open(&self, message: SubMessage) -> Result<()> {
        if self.closed {
            return Err(ProtocolError::UnexpectedMessage {
                message,
                state: SessionState::Closed,
            });
        }
        Ok(())
    }
}

impl<S: PartitionSink + ?Sized> Drop for IngestSession<'_, S> {
    fn drop(&mut self) {
        if let Some(set) = &self.active {
            warn!(
                dataset = set.dataset(),
                partition = set.partition(),
                "ingest aborted; builder set discarded"
            );
        }
    }
}
