//! Columnar ingest and export of dataset partitions for external processes.
//!
//! An external process streams typed column values into a new partition of
//! a named dataset, or reads a sealed partition back cell by cell, over a
//! plain TCP connection.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP listen, accept and connect
//! - [`wire`]: native-endian primitive codec (ints, doubles, strings, byte arrays)
//! - [`store`]: partition builder and row reader adapters, plus the in-memory store
//! - [`protocol`]: `CREATE_FRAME` / `DOWNLOAD_FRAME` handling, server and client

/// Re-export transport types.
pub mod transport {
    pub use extframe_transport::*;
}

/// Re-export wire codec types.
pub mod wire {
    pub use extframe_wire::*;
}

/// Re-export store types.
pub mod store {
    pub use extframe_store::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use extframe_protocol::*;
}
