//! Request, sub-message and data-type codes.
//!
//! ```text
//! envelope         : [reserved u16 (legacy only)] requestType:int
//! CREATE_FRAME     : sub-message*  (each prefixed by its int code, ends with CLOSE_NEW_CHUNK)
//!   CREATE_NEW_CHUNK : name:str colTypes:bytes partitionId:int
//!   ADD_TO_FRAME     : dataType:int colIdx:int payload(NUM: double | STR: str | NA: -)
//!   CLOSE_NEW_CHUNK  : -
//! DOWNLOAD_FRAME   : name:str partitionId:int
//!   response         : rowCount:int, then per cell isNA:int [payload]
//! ```

use std::fmt;

use crate::error::ProtocolError;

/// Top-level request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    CreateFrame = 0,
    DownloadFrame = 1,
}

impl TryFrom<i32> for RequestType {
    type Error = ProtocolError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RequestType::CreateFrame),
            1 => Ok(RequestType::DownloadFrame),
            other => Err(ProtocolError::UnknownRequest(other)),
        }
    }
}

impl RequestType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Sub-message of a `CREATE_FRAME` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubMessage {
    CreateNewChunk = 2,
    AddToFrame = 3,
    CloseNewChunk = 4,
}

impl TryFrom<i32> for SubMessage {
    type Error = ProtocolError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            2 => Ok(SubMessage::CreateNewChunk),
            3 => Ok(SubMessage::AddToFrame),
            4 => Ok(SubMessage::CloseNewChunk),
            other => Err(ProtocolError::UnknownSubMessage(other)),
        }
    }
}

impl SubMessage {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for SubMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubMessage::CreateNewChunk => "CREATE_NEW_CHUNK",
            SubMessage::AddToFrame => "ADD_TO_FRAME",
            SubMessage::CloseNewChunk => "CLOSE_NEW_CHUNK",
        })
    }
}

/// Payload tag of an `ADD_TO_FRAME` sub-message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTag {
    Num = 1,
    Str = 2,
    Na = 3,
}

impl TryFrom<i32> for DataTag {
    type Error = ProtocolError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(DataTag::Num),
            2 => Ok(DataTag::Str),
            3 => Ok(DataTag::Na),
            other => Err(ProtocolError::UnknownDataType(other)),
        }
    }
}

impl DataTag {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Null flag values of an exported cell.
pub const CELL_PRESENT: i32 = 0;
pub const CELL_NA: i32 = 1;
