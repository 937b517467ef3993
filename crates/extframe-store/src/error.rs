use crate::types::{ColumnType, PartitionId};

/// Errors raised by dataset stores and their partition builders.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No dataset is registered under the name.
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    /// A dataset with the name is already declared.
    #[error("dataset already exists: {0}")]
    DatasetExists(String),

    /// The dataset has no partition with the id.
    #[error("partition {partition} not found in dataset {dataset}")]
    PartitionNotFound {
        dataset: String,
        partition: PartitionId,
    },

    /// The partition id is already published for the dataset.
    #[error("partition {partition} already exists in dataset {dataset}")]
    PartitionExists {
        dataset: String,
        partition: PartitionId,
    },

    /// Requested column types disagree with the dataset's declared columns.
    #[error("column types for dataset {dataset} do not match: expected {expected:?}, got {actual:?}")]
    SchemaMismatch {
        dataset: String,
        expected: Vec<ColumnType>,
        actual: Vec<ColumnType>,
    },

    /// A value cannot be stored in a column of this type.
    #[error("column {column} ({column_type}) cannot hold {value}")]
    TypeMismatch {
        column: usize,
        column_type: ColumnType,
        value: String,
    },

    /// A UUID column received text that is not a UUID.
    #[error("column {column}: invalid uuid {text:?}: {source}")]
    InvalidUuid {
        column: usize,
        text: String,
        source: uuid::Error,
    },

    /// Column builders of one partition hold different row counts.
    #[error("partition {partition} of dataset {dataset} is ragged: column row counts {counts:?}")]
    RaggedPartition {
        dataset: String,
        partition: PartitionId,
        counts: Vec<usize>,
    },

    /// A column or row index is outside the partition.
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;
