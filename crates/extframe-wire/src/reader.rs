use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use extframe_transport::Connection;
use tracing::trace;

use crate::codec::{check_length, WireConfig, INT_SIZE, WORD_SIZE};
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads primitive wire values from any `Read` stream.
///
/// Values are decoded in the order they were written. Partial reads are
/// handled internally; a value is returned only once all of its bytes have
/// arrived.
pub struct WireReader<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Read> WireReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read two raw bytes.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.fill(2)?;
        Ok(self.buf.get_u16_ne())
    }

    /// Read a 4-byte signed integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.fill(INT_SIZE)?;
        Ok(self.buf.get_i32_ne())
    }

    /// Read an 8-byte signed integer.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.fill(WORD_SIZE)?;
        Ok(self.buf.get_i64_ne())
    }

    /// Read an 8-byte float.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.fill(WORD_SIZE)?;
        Ok(self.buf.get_f64_ne())
    }

    /// Read a length-prefixed string, `None` for the null marker.
    pub fn read_opt_str(&mut self) -> Result<Option<String>> {
        match self.read_len()? {
            Some(len) => {
                let raw = self.take(len)?;
                Ok(Some(String::from_utf8(raw)?))
            }
            None => Ok(None),
        }
    }

    /// Read a length-prefixed string that must not be null.
    pub fn read_str(&mut self) -> Result<String> {
        self.read_opt_str()?.ok_or(WireError::UnexpectedNull)
    }

    /// Read a length-prefixed byte array. A null array decodes as empty.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        match self.read_len()? {
            Some(len) => self.take(len),
            None => Ok(Vec::new()),
        }
    }

    /// Number of bytes already received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn read_len(&mut self) -> Result<Option<usize>> {
        let len = self.read_i32()?;
        check_length(len, self.config.max_string_len)
    }

    fn take(&mut self, len: usize) -> Result<Vec<u8>> {
        self.fill(len)?;
        Ok(self.buf.split_to(len).to_vec())
    }

    /// Block until at least `needed` bytes are buffered.
    fn fill(&mut self, needed: usize) -> Result<()> {
        if self.buf.len() >= needed {
            return Ok(());
        }
        self.buf.reserve(needed - self.buf.len());

        while self.buf.len() < needed {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                trace!(buffered = self.buf.len(), needed, "peer closed mid-read");
                return Err(WireError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl WireReader<Connection> {
    /// Create a reader for a `Connection` and apply the read timeout from config.
    pub fn with_config_conn(inner: Connection, config: WireConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_wire_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_wire_error(err: extframe_transport::TransportError) -> WireError {
    match err {
        extframe_transport::TransportError::Io(io)
        | extframe_transport::TransportError::Accept(io) => WireError::Io(io),
        extframe_transport::TransportError::Bind { source, .. }
        | extframe_transport::TransportError::Connect { source, .. } => WireError::Io(source),
        other => WireError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::Message;

    fn reader_for(msg: &Message) -> WireReader<Cursor<Vec<u8>>> {
        WireReader::new(Cursor::new(msg.as_bytes().to_vec()))
    }

    #[test]
    fn reads_values_in_written_order() {
        let mut msg = Message::new();
        msg.put_i32(2).put_i64(i64::MIN).put_f64(-0.5);
        msg.put_str("dataset").unwrap();
        msg.put_bytes(&[3, 2, 4]).unwrap();

        let mut reader = reader_for(&msg);
        assert_eq!(reader.read_i32().unwrap(), 2);
        assert_eq!(reader.read_i64().unwrap(), i64::MIN);
        assert_eq!(reader.read_f64().unwrap(), -0.5);
        assert_eq!(reader.read_str().unwrap(), "dataset");
        assert_eq!(reader.read_bytes().unwrap(), vec![3, 2, 4]);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn null_string_is_none() {
        let mut msg = Message::new();
        msg.put_opt_str(None).unwrap();
        msg.put_opt_str(None).unwrap();

        let mut reader = reader_for(&msg);
        assert_eq!(reader.read_opt_str().unwrap(), None);
        assert!(matches!(reader.read_str(), Err(WireError::UnexpectedNull)));
    }

    #[test]
    fn null_byte_array_is_empty() {
        let mut msg = Message::new();
        msg.put_i32(-1);

        let mut reader = reader_for(&msg);
        assert!(reader.read_bytes().unwrap().is_empty());
    }

    #[test]
    fn negative_length_rejected() {
        let mut msg = Message::new();
        msg.put_i32(-7);

        let mut reader = reader_for(&msg);
        assert!(matches!(
            reader.read_str(),
            Err(WireError::InvalidLength(-7))
        ));
    }

    #[test]
    fn oversized_string_rejected_before_allocation() {
        let mut msg = Message::new();
        msg.put_i32(1024);

        let cfg = WireConfig {
            max_string_len: 16,
            ..WireConfig::default()
        };
        let mut reader = WireReader::with_config(Cursor::new(msg.as_bytes().to_vec()), cfg);
        assert!(matches!(
            reader.read_str(),
            Err(WireError::LengthTooLarge { size: 1024, max: 16 })
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut msg = Message::new();
        msg.put_bytes(&[0xff, 0xfe]).unwrap();

        let mut reader = reader_for(&msg);
        assert!(matches!(reader.read_str(), Err(WireError::InvalidUtf8(_))));
    }

    #[test]
    fn partial_read_handling() {
        let mut msg = Message::new();
        msg.put_i32(42).put_f64(1.5);
        msg.put_str("slow").unwrap();

        let byte_reader = ByteByByteReader {
            bytes: msg.as_bytes().to_vec(),
            pos: 0,
        };
        let mut reader = WireReader::new(byte_reader);

        assert_eq!(reader.read_i32().unwrap(), 42);
        assert_eq!(reader.read_f64().unwrap(), 1.5);
        assert_eq!(reader.read_str().unwrap(), "slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = WireReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_i32().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_value() {
        let mut msg = Message::new();
        msg.put_i32(16);
        let mut wire = msg.as_bytes().to_vec();
        wire.extend_from_slice(b"only-part");

        let mut reader = WireReader::new(Cursor::new(wire));
        let err = reader.read_str().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut msg = Message::new();
        msg.put_i32(8);

        let reader = InterruptedThenData {
            interrupted: false,
            bytes: msg.as_bytes().to_vec(),
            pos: 0,
        };
        let mut wire = WireReader::new(reader);
        assert_eq!(wire.read_i32().unwrap(), 8);
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_socket_pair() {
        let (mut left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut reader = WireReader::new(right);

        let mut msg = Message::new();
        msg.put_i32(1);
        msg.put_str("ping").unwrap();
        std::io::Write::write_all(&mut left, msg.as_bytes()).unwrap();

        assert_eq!(reader.read_i32().unwrap(), 1);
        assert_eq!(reader.read_str().unwrap(), "ping");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
