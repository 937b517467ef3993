//! The two narrow interfaces the protocol consumes from a dataset store.
//!
//! [`PartitionSink`] allocates per-column builders for one new partition and
//! [`BuilderSet::seal`] publishes them. [`PartitionSource`] resolves a dataset
//! for reading. A store implementing both can serve ingest and export.

use std::sync::Arc;

use crate::error::Result;
use crate::types::{Cell, CellValue, ColumnSpec, ColumnType, PartitionId};

/// Partition builder adapter.
pub trait PartitionSink: Send + Sync {
    /// Allocate one builder per column for `partition` of `dataset`.
    ///
    /// Nothing becomes visible to readers until the returned set is sealed.
    fn allocate(
        &self,
        dataset: &str,
        column_types: &[ColumnType],
        partition: PartitionId,
    ) -> Result<Box<dyn BuilderSet>>;
}

/// The per-column builders of one unsealed partition.
///
/// Dropping a set without sealing it discards every appended value.
pub trait BuilderSet: Send {
    /// Dataset the set was allocated for.
    fn dataset(&self) -> &str;

    /// Partition the set was allocated for.
    fn partition(&self) -> PartitionId;

    /// Number of column builders. Fixed for the lifetime of the set.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value (or null) to `column`.
    fn append(&mut self, column: usize, value: CellValue) -> Result<()>;

    /// Publish all columns of the partition atomically.
    ///
    /// Returns the partition's row count. On error nothing is published.
    fn seal(self: Box<Self>) -> Result<usize>;
}

/// Row reader adapter.
pub trait PartitionSource: Send + Sync {
    /// Resolve a dataset by name.
    fn resolve(&self, dataset: &str) -> Result<Arc<dyn DatasetView>>;
}

/// Read access to one resolved dataset.
pub trait DatasetView: Send + Sync {
    /// Declared columns, in order.
    fn columns(&self) -> &[ColumnSpec];

    /// Row count of a partition.
    fn partition_row_count(&self, partition: PartitionId) -> Result<usize>;

    /// Read one cell. Categorical codes are resolved to their domain string
    /// and UUIDs are formatted as canonical text.
    fn read_cell(&self, partition: PartitionId, column: usize, row: usize) -> Result<Cell>;
}
