//! Primitive wire codec for the external frame protocol.
//!
//! Messages are plain sequences of primitives with no outer framing:
//! - 4-byte signed integers
//! - 8-byte signed integers and 8-byte IEEE-754 floats
//! - length-prefixed UTF-8 strings (`-1` length marks null)
//! - length-prefixed byte arrays
//!
//! All fields use the platform's native byte order. This is not negotiated;
//! both ends of a connection must share it.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{Message, WireConfig, DEFAULT_MAX_STRING_LEN, INT_SIZE, NULL_LENGTH, WORD_SIZE};
pub use error::{Result, WireError};
pub use reader::WireReader;
pub use writer::WireWriter;
