//! TCP connection setup for the external frame protocol.
//!
//! This is the lowest layer of extframe. It binds, accepts and connects raw
//! TCP sockets and hands out [`Connection`]s; everything above it speaks the
//! protocol over those connections.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::Connection;
pub use tcp::TcpTransport;
