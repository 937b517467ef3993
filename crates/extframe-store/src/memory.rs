use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::adapter::{BuilderSet, DatasetView, PartitionSink, PartitionSource};
use crate::builder::{ColumnBuilder, ColumnData};
use crate::error::{Result, StoreError};
use crate::types::{Cell, CellValue, ColumnSpec, ColumnType, PartitionId};

/// In-process dataset store.
///
/// Datasets are immutable snapshots behind `Arc`; sealing a partition swaps
/// in a new snapshot under the write lock, so readers observe either every
/// column of a partition or none of it. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryStore {
    datasets: Arc<RwLock<HashMap<String, Arc<MemoryDataset>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dataset's columns (and categorical domains) ahead of ingest.
    pub fn declare_dataset(&self, name: &str, columns: Vec<ColumnSpec>) -> Result<()> {
        let mut datasets = self.datasets.write().map_err(|_| StoreError::Poisoned)?;
        if datasets.contains_key(name) {
            return Err(StoreError::DatasetExists(name.to_string()));
        }
        datasets.insert(
            name.to_string(),
            Arc::new(MemoryDataset::new(name.to_string(), columns)),
        );
        debug!(dataset = name, "declared dataset");
        Ok(())
    }

    /// Names of all datasets, sorted.
    pub fn dataset_names(&self) -> Result<Vec<String>> {
        let datasets = self.datasets.read().map_err(|_| StoreError::Poisoned)?;
        let mut names: Vec<String> = datasets.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Published partition ids of a dataset, ascending.
    pub fn partition_ids(&self, name: &str) -> Result<Vec<PartitionId>> {
        let dataset = self.get(name)?;
        Ok(dataset.partitions.keys().copied().collect())
    }

    /// True when `partition` of `name` has been sealed.
    pub fn contains_partition(&self, name: &str, partition: PartitionId) -> bool {
        self.get(name)
            .map(|d| d.partitions.contains_key(&partition))
            .unwrap_or(false)
    }

    fn get(&self, name: &str) -> Result<Arc<MemoryDataset>> {
        let datasets = self.datasets.read().map_err(|_| StoreError::Poisoned)?;
        datasets
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::DatasetNotFound(name.to_string()))
    }

    fn publish(
        &self,
        name: &str,
        partition: PartitionId,
        builders: Vec<ColumnBuilder>,
    ) -> Result<usize> {
        let counts: Vec<usize> = builders.iter().map(ColumnBuilder::len).collect();
        let rows = counts.first().copied().unwrap_or(0);
        if counts.iter().any(|c| *c != rows) {
            return Err(StoreError::RaggedPartition {
                dataset: name.to_string(),
                partition,
                counts,
            });
        }
        let types: Vec<ColumnType> = builders.iter().map(ColumnBuilder::column_type).collect();

        let mut datasets = self.datasets.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = match datasets.get(name) {
            Some(existing) => {
                existing.check_types(&types)?;
                existing.check_absent(partition)?;
                MemoryDataset::clone(existing)
            }
            None => MemoryDataset::new(name.to_string(), default_columns(&types)),
        };

        let columns = builders
            .into_iter()
            .zip(next.columns.iter_mut())
            .enumerate()
            .map(|(column, (builder, spec))| builder.finish(column, spec))
            .collect::<Result<Vec<_>>>()?;
        next.partitions
            .insert(partition, Arc::new(SealedPartition { rows, columns }));
        datasets.insert(name.to_string(), Arc::new(next));

        info!(dataset = name, partition, rows, "partition published");
        Ok(rows)
    }
}

impl PartitionSink for MemoryStore {
    fn allocate(
        &self,
        dataset: &str,
        column_types: &[ColumnType],
        partition: PartitionId,
    ) -> Result<Box<dyn BuilderSet>> {
        let specs = match self.get(dataset) {
            Ok(existing) => {
                existing.check_types(column_types)?;
                existing.check_absent(partition)?;
                existing.columns.clone()
            }
            Err(StoreError::DatasetNotFound(_)) => default_columns(column_types),
            Err(err) => return Err(err),
        };

        debug!(
            dataset,
            partition,
            columns = column_types.len(),
            "allocated builder set"
        );
        Ok(Box::new(MemoryBuilderSet {
            store: self.clone(),
            dataset: dataset.to_string(),
            partition,
            builders: specs.iter().map(ColumnBuilder::new).collect(),
            sealed: false,
        }))
    }
}

impl PartitionSource for MemoryStore {
    fn resolve(&self, dataset: &str) -> Result<Arc<dyn DatasetView>> {
        let dataset: Arc<dyn DatasetView> = self.get(dataset)?;
        Ok(dataset)
    }
}

/// Unsealed builders of one partition of a [`MemoryStore`] dataset.
pub struct MemoryBuilderSet {
    store: MemoryStore,
    dataset: String,
    partition: PartitionId,
    builders: Vec<ColumnBuilder>,
    sealed: bool,
}

impl BuilderSet for MemoryBuilderSet {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    fn partition(&self) -> PartitionId {
        self.partition
    }

    fn len(&self) -> usize {
        self.builders.len()
    }

    fn append(&mut self, column: usize, value: CellValue) -> Result<()> {
        let len = self.builders.len();
        let builder = self
            .builders
            .get_mut(column)
            .ok_or(StoreError::OutOfRange {
                what: "column",
                index: column,
                len,
            })?;
        builder.append(column, value)
    }

    fn seal(mut self: Box<Self>) -> Result<usize> {
        let builders = std::mem::take(&mut self.builders);
        let published = self.store.publish(&self.dataset, self.partition, builders);
        self.sealed = published.is_ok();
        published
    }
}

impl Drop for MemoryBuilderSet {
    fn drop(&mut self) {
        if !self.sealed {
            debug!(
                dataset = %self.dataset,
                partition = self.partition,
                "discarding unsealed builder set"
            );
        }
    }
}

/// Columns of a dataset created by its first seal: `C1`, `C2`, ... with
/// real-valued numerics.
fn default_columns(types: &[ColumnType]) -> Vec<ColumnSpec> {
    types
        .iter()
        .enumerate()
        .map(|(i, t)| ColumnSpec::new(format!("C{}", i + 1), *t))
        .collect()
}

/// Read-only snapshot of one dataset.
#[derive(Clone)]
pub struct MemoryDataset {
    name: String,
    columns: Vec<ColumnSpec>,
    partitions: BTreeMap<PartitionId, Arc<SealedPartition>>,
}

struct SealedPartition {
    rows: usize,
    columns: Vec<ColumnData>,
}

impl MemoryDataset {
    fn new(name: String, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name,
            columns,
            partitions: BTreeMap::new(),
        }
    }

    fn check_types(&self, types: &[ColumnType]) -> Result<()> {
        let expected: Vec<ColumnType> = self.columns.iter().map(|c| c.column_type).collect();
        if expected != types {
            return Err(StoreError::SchemaMismatch {
                dataset: self.name.clone(),
                expected,
                actual: types.to_vec(),
            });
        }
        Ok(())
    }

    fn check_absent(&self, partition: PartitionId) -> Result<()> {
        if self.partitions.contains_key(&partition) {
            return Err(StoreError::PartitionExists {
                dataset: self.name.clone(),
                partition,
            });
        }
        Ok(())
    }

    fn partition(&self, partition: PartitionId) -> Result<&SealedPartition> {
        self.partitions
            .get(&partition)
            .map(Arc::as_ref)
            .ok_or_else(|| StoreError::PartitionNotFound {
                dataset: self.name.clone(),
                partition,
            })
    }
}

impl DatasetView for MemoryDataset {
    fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    fn partition_row_count(&self, partition: PartitionId) -> Result<usize> {
        Ok(self.partition(partition)?.rows)
    }

    fn read_cell(&self, partition: PartitionId, column: usize, row: usize) -> Result<Cell> {
        let part = self.partition(partition)?;
        let data = part.columns.get(column).ok_or(StoreError::OutOfRange {
            what: "column",
            index: column,
            len: part.columns.len(),
        })?;
        data.cell(row, &self.columns[column].domain)
    }
}
