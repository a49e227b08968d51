use crate::types::{KeyColumn, PartitionKey};
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Which side of the classifier capability failed for a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelStage {
    Fit,
    Predict,
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fit => f.write_str("fit"),
            Self::Predict => f.write_str("predict"),
        }
    }
}

/// The shape problems detected before any partition is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    #[error("Partition key column {column} is not present in {matrix}.")]
    KeyColumnMissing {
        column: KeyColumn,
        matrix: &'static str,
    },
    #[error("The training matrix has {features} rows but {labels} labels were supplied.")]
    RowCountMismatch { features: usize, labels: usize },
    #[error(
        "The test matrix columns [{test}] do not match the training matrix columns [{train}]."
    )]
    ColumnLayoutMismatch { train: String, test: String },
    #[error("Feature column '{0}' is categorical; every non-key column must be numeric.")]
    NonNumericFeature(String),
    #[error("Row {row} of {matrix} has a NaN partition key, which matches no other row.")]
    NaNKey { matrix: &'static str, row: usize },
}

/// Reassembly found an output slot that was not written exactly once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyError {
    #[error("Partition '{key}' wrote to row {position}, but the test set only has {len} rows.")]
    PositionOutOfRange {
        key: PartitionKey,
        position: usize,
        len: usize,
    },
    #[error("Row {position} received a second prediction from partition '{key}'.")]
    SlotWrittenTwice { key: PartitionKey, position: usize },
    #[error("Row {position} of the test set received no prediction.")]
    SlotUnfilled { position: usize },
}

/// Every way a partitioned prediction run can fail. There is no partial
/// success: either every test row receives a prediction or one of these is
/// returned.
#[derive(Error, Debug)]
pub enum EnsembleError {
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),
    #[error(
        "Partition key '{key}' occurs in the test set but never in the training set, so no model can be trained for it."
    )]
    UnseenPartitionKey { key: PartitionKey },
    #[error("Partition '{key}' has test rows but no training rows.")]
    EmptyPartitionTraining { key: PartitionKey },
    #[error("The model for partition '{key}' failed during {stage}: {source}")]
    ModelFitFailure {
        key: PartitionKey,
        stage: ModelStage,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("The model for partition '{key}' returned {found} predictions for {expected} test rows.")]
    PredictionCountMismatch {
        key: PartitionKey,
        expected: usize,
        found: usize,
    },
    #[error("Reassembly failed: {0}")]
    Reassembly(#[from] ReassemblyError),
}

impl EnsembleError {
    /// The partition the failure is attributed to, if any.
    pub fn partition_key(&self) -> Option<&PartitionKey> {
        match self {
            Self::UnseenPartitionKey { key }
            | Self::EmptyPartitionTraining { key }
            | Self::ModelFitFailure { key, .. }
            | Self::PredictionCountMismatch { key, .. } => Some(key),
            Self::Reassembly(ReassemblyError::PositionOutOfRange { key, .. })
            | Self::Reassembly(ReassemblyError::SlotWrittenTwice { key, .. }) => Some(key),
            Self::SchemaMismatch(_) | Self::Reassembly(ReassemblyError::SlotUnfilled { .. }) => {
                None
            }
        }
    }
}
