/// Errors that can occur while encoding or decoding wire values.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A string or byte-array length prefix was negative (other than the null marker).
    #[error("invalid length prefix {0}")]
    InvalidLength(i32),

    /// A length exceeds the configured maximum.
    #[error("length too large ({size} bytes, max {max})")]
    LengthTooLarge { size: usize, max: usize },

    /// A null string was received where a value is required.
    #[error("unexpected null string")]
    UnexpectedNull,

    /// A string payload was not valid UTF-8.
    #[error("string payload is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// An I/O error occurred while reading or writing.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete value was transferred.
    #[error("connection closed (incomplete value)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
