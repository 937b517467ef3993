use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};

/// Wire size of an `int` field.
pub const INT_SIZE: usize = 4;

/// Wire size of a `long` or `double` field.
pub const WORD_SIZE: usize = 8;

/// Length prefix marking a null string.
pub const NULL_LENGTH: i32 = -1;

/// Default maximum string or byte-array length: 16 MiB.
pub const DEFAULT_MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// One logical protocol message: a contiguous, exactly-sized byte buffer.
///
/// Values are appended in wire order. All multi-byte fields use the
/// platform's native byte order; both ends must agree on it.
///
/// ```text
/// int    : 4 bytes, native order
/// long   : 8 bytes, native order
/// double : 8 bytes IEEE-754, native order
/// str    : int length (-1 = null) + UTF-8 bytes
/// bytes  : int length + raw bytes
/// ```
#[derive(Debug, Clone, Default)]
pub struct Message {
    buf: BytesMut,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty message with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Append two raw bytes (the legacy reserved envelope field).
    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_ne(value);
        self
    }

    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32_ne(value);
        self
    }

    pub fn put_i64(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64_ne(value);
        self
    }

    pub fn put_f64(&mut self, value: f64) -> &mut Self {
        self.buf.put_f64_ne(value);
        self
    }

    /// Append a length-prefixed UTF-8 string.
    pub fn put_str(&mut self, value: &str) -> Result<&mut Self> {
        self.put_bytes(value.as_bytes())
    }

    /// Append a length-prefixed string, encoding `None` as the null marker.
    pub fn put_opt_str(&mut self, value: Option<&str>) -> Result<&mut Self> {
        match value {
            Some(value) => self.put_str(value),
            None => Ok(self.put_i32(NULL_LENGTH)),
        }
    }

    /// Append a length-prefixed byte array.
    pub fn put_bytes(&mut self, value: &[u8]) -> Result<&mut Self> {
        let len = i32::try_from(value.len()).map_err(|_| WireError::LengthTooLarge {
            size: value.len(),
            max: i32::MAX as usize,
        })?;
        self.buf.reserve(INT_SIZE + value.len());
        self.buf.put_i32_ne(len);
        self.buf.put_slice(value);
        Ok(self)
    }

    /// Number of encoded bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The encoded bytes, exactly as they go on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Discard the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Configuration for the wire codec.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Maximum accepted string or byte-array length. Default: 16 MiB.
    pub max_string_len: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_string_len: DEFAULT_MAX_STRING_LEN,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Check a decoded length prefix against the configured maximum.
///
/// Returns `Ok(None)` for the null marker.
pub fn check_length(len: i32, max: usize) -> Result<Option<usize>> {
    if len == NULL_LENGTH {
        return Ok(None);
    }
    let size = usize::try_from(len).map_err(|_| WireError::InvalidLength(len))?;
    if size > max {
        return Err(WireError::LengthTooLarge { size, max });
    }
    Ok(Some(size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_exactly_sized() {
        let mut msg = Message::new();
        msg.put_i32(7).put_i64(-1).put_f64(2.5);
        msg.put_str("abc").unwrap();

        assert_eq!(msg.len(), INT_SIZE + WORD_SIZE + WORD_SIZE + INT_SIZE + 3);
    }

    #[test]
    fn fields_use_native_order() {
        let mut msg = Message::new();
        msg.put_i32(0x0102_0304).put_f64(6.25);

        let bytes = msg.as_bytes();
        assert_eq!(&bytes[..4], &0x0102_0304i32.to_ne_bytes());
        assert_eq!(&bytes[4..12], &6.25f64.to_ne_bytes());
    }

    #[test]
    fn string_is_length_prefixed() {
        let mut msg = Message::new();
        msg.put_str("héllo").unwrap();

        let bytes = msg.as_bytes();
        assert_eq!(&bytes[..4], &6i32.to_ne_bytes());
        assert_eq!(&bytes[4..], "héllo".as_bytes());
    }

    #[test]
    fn null_string_uses_marker() {
        let mut msg = Message::new();
        msg.put_opt_str(None).unwrap();
        assert_eq!(msg.as_bytes(), &NULL_LENGTH.to_ne_bytes());
    }

    #[test]
    fn empty_string_is_not_null() {
        let mut msg = Message::new();
        msg.put_str("").unwrap();
        assert_eq!(msg.as_bytes(), &0i32.to_ne_bytes());
    }

    #[test]
    fn check_length_bounds() {
        assert_eq!(check_length(-1, 10).unwrap(), None);
        assert_eq!(check_length(0, 10).unwrap(), Some(0));
        assert_eq!(check_length(10, 10).unwrap(), Some(10));
        assert!(matches!(
            check_length(11, 10),
            Err(WireError::LengthTooLarge { size: 11, max: 10 })
        ));
        assert!(matches!(
            check_length(-2, 10),
            Err(WireError::InvalidLength(-2))
        ));
    }

    #[test]
    fn clear_keeps_message_reusable() {
        let mut msg = Message::with_capacity(64);
        msg.put_i32(1);
        msg.clear();
        assert!(msg.is_empty());
        msg.put_i32(2);
        assert_eq!(msg.as_bytes(), &2i32.to_ne_bytes());
    }
}
