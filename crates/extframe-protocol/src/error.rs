use crate::message::SubMessage;
use crate::session::SessionState;

/// Broad class of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The peer broke the message grammar or state machine.
    Protocol,
    /// The connection failed mid-message.
    Transport,
    /// The store rejected the request (missing dataset, bad value, ...).
    Data,
}

/// Errors that abort one connection's protocol run.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Unrecognized top-level request code.
    #[error("unknown request type {0}")]
    UnknownRequest(i32),

    /// Unrecognized `CREATE_FRAME` sub-message code.
    #[error("unknown sub-message type {0}")]
    UnknownSubMessage(i32),

    /// Unrecognized `ADD_TO_FRAME` data tag.
    #[error("unknown data type {0}")]
    UnknownDataType(i32),

    /// Unrecognized column type byte in `CREATE_NEW_CHUNK`.
    #[error("unknown column type {code} for column {column}")]
    UnknownColumnType { column: usize, code: u8 },

    /// A sub-message arrived in a state that does not accept it.
    #[error("{message} not valid while {state}")]
    UnexpectedMessage {
        message: SubMessage,
        state: SessionState,
    },

    /// `ADD_TO_FRAME` named a column outside the active builder set.
    #[error("column index {column} out of range ({columns} columns)")]
    ColumnOutOfRange { column: i32, columns: usize },

    /// Partition ids are non-negative.
    #[error("invalid partition id {0}")]
    InvalidPartition(i32),

    /// The partition has more rows than the header can express.
    #[error("partition row count {0} exceeds the wire limit")]
    TooManyRows(usize),

    /// An export header carried a negative row count.
    #[error("invalid row count {0}")]
    InvalidRowCount(i32),

    /// An exported cell carried a null flag other than 0 or 1.
    #[error("invalid null flag {0}")]
    InvalidNullFlag(i32),

    /// Wire codec error.
    #[error("wire error: {0}")]
    Wire(#[from] extframe_wire::WireError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] extframe_transport::TransportError),

    /// Dataset store error.
    #[error("store error: {0}")]
    Store(#[from] extframe_store::StoreError),
}

impl ProtocolError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        use extframe_wire::WireError;

        match self {
            ProtocolError::Wire(WireError::Io(_) | WireError::ConnectionClosed)
            | ProtocolError::Transport(_) => ErrorKind::Transport,
            ProtocolError::Store(_) => ErrorKind::Data,
            _ => ErrorKind::Protocol,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(ProtocolError::UnknownRequest(9).kind(), ErrorKind::Protocol);
        assert_eq!(
            ProtocolError::from(extframe_wire::WireError::ConnectionClosed).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ProtocolError::from(extframe_wire::WireError::UnexpectedNull).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            ProtocolError::from(extframe_store::StoreError::DatasetNotFound("x".into())).kind(),
            ErrorKind::Data
        );
    }

    #[test]
    fn unexpected_message_display() {
        let err = ProtocolError::UnexpectedMessage {
            message: SubMessage::AddToFrame,
            state: SessionState::Idle,
        };
        assert_eq!(err.to_string(), "ADD_TO_FRAME not valid while IDLE");
    }
}
