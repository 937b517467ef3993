//! External frame protocol: columnar ingest and export over one TCP
//! connection per request.
//!
//! A client either streams a new partition in (`CREATE_FRAME`) or reads a
//! sealed partition back cell by cell (`DOWNLOAD_FRAME`). The server side is
//! [`Server`], which runs [`dispatch`] against any store implementing the
//! `extframe-store` adapter traits. The client side is [`Client`],
//! [`FrameUploader`] and [`download_partition`].

pub mod client;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod ingest;
pub mod message;
pub mod server;
pub mod session;

pub use client::{
    connect, connect_with_config, download_partition, Client, ClientConfig, DownloadedPartition,
    ExportKind, FrameUploader,
};
pub use dispatch::{dispatch, Outcome};
pub use error::{ErrorKind, ProtocolError, Result};
pub use export::{encode_cell, run_export, ExportSummary};
pub use ingest::run_ingest;
pub use message::{DataTag, RequestType, SubMessage, CELL_NA, CELL_PRESENT};
pub use server::{serve_connection, Server, ServerConfig, ShutdownHandle};
pub use session::{IngestSession, IngestSummary, SessionState};
