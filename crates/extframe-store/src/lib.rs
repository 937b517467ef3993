//! Dataset store adapters for the external frame protocol.
//!
//! The protocol never touches column storage directly. It goes through two
//! narrow interfaces:
//! - [`PartitionSink`] / [`BuilderSet`]: allocate, append to and seal the
//!   per-column builders of one new partition
//! - [`PartitionSource`] / [`DatasetView`]: resolve a dataset and read the
//!   cells of one of its partitions
//!
//! [`MemoryStore`] implements both over in-process snapshots and is what the
//! server binary and the tests run against.

pub mod adapter;
mod builder;
pub mod error;
pub mod memory;
pub mod types;

pub use adapter::{BuilderSet, DatasetView, PartitionSink, PartitionSource};
pub use error::{Result, StoreError};
pub use memory::{MemoryBuilderSet, MemoryDataset, MemoryStore};
pub use types::{Cell, CellValue, ColumnSpec, ColumnType, NumericKind, PartitionId};
