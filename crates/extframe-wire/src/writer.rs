use std::io::{ErrorKind, Write};

use extframe_transport::Connection;
use tracing::trace;

use crate::codec::{Message, WireConfig};
use crate::error::{Result, WireError};
use crate::reader::transport_to_wire_error;

/// Writes complete messages to any `Write` stream.
///
/// Each [`Message`] is transmitted as one logical unit: the writer loops
/// until every byte has been accepted by the transport, then flushes.
pub struct WireWriter<T> {
    inner: T,
    config: WireConfig,
    messages_sent: u64,
}

impl<T: Write> WireWriter<T> {
    /// Create a new writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new writer with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            config,
            messages_sent: 0,
        }
    }

    /// Write a complete message (blocking).
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let bytes = message.as_bytes();

        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => {
                    trace!(written = offset, total = bytes.len(), "peer stopped accepting bytes");
                    return Err(WireError::ConnectionClosed);
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => {
                    trace!(written = offset, total = bytes.len(), "write timed out");
                    return Err(WireError::Io(err));
                }
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        self.flush()?;
        self.messages_sent += 1;
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Number of messages fully written so far.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

/// A blocking socket reports an expired write timeout as `WouldBlock` on Unix
/// and `TimedOut` on Windows. Either one ends the message.
fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

impl WireWriter<Connection> {
    /// Create a writer for a `Connection` and apply the write timeout from config.
    pub fn with_config_conn(inner: Connection, config: WireConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_wire_error)?;
        Ok(Self::with_config(inner, config))
    }
}
