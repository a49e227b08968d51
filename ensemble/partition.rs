//! # Partitioner
//!
//! Splits a row-aligned `(X_train, y_train)` pair and a separate `X_test` into
//! disjoint groups keyed by one categorical column. The key column is dropped
//! from every group's matrices because it is constant inside a group, and the
//! original position of every test row is kept so predictions can be put back
//! in place afterwards.
//!
//! All validation happens up front: a schema problem or a test key that never
//! occurs in training fails the call before any group matrix is allocated.

use crate::error::{EnsembleError, SchemaMismatch};
use crate::frame::{Column, FeatureFrame};
use crate::types::{KeyColumn, Label, PartitionKey};
use itertools::Itertools;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// One group of rows sharing a key value, with the key column removed.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionData {
    pub key: PartitionKey,
    pub x_train: Array2<f64>,
    pub y_train: Vec<Label>,
    pub x_test: Array2<f64>,
    /// `test_row_positions[j]` is the row of the original test matrix that
    /// `x_test` row `j` was taken from.
    pub test_row_positions: Vec<usize>,
}

impl PartitionData {
    pub fn train_rows(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn test_rows(&self) -> usize {
        self.x_test.nrows()
    }
}

/// The partitioner's output: every group in key order plus what reassembly
/// needs to know about the original test matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Partitions {
    partitions: BTreeMap<PartitionKey, PartitionData>,
    test_row_count: usize,
    feature_names: Vec<String>,
}

impl Partitions {
    /// Assembles partitions built elsewhere. No overlap checks are made here;
    /// the coordinator detects overlapping or missing positions at reassembly.
    pub fn from_parts(
        partitions: impl IntoIterator<Item = PartitionData>,
        test_row_count: usize,
        feature_names: Vec<String>,
    ) -> Self {
        Self {
            partitions: partitions
                .into_iter()
                .map(|data| (data.key.clone(), data))
                .collect(),
            test_row_count,
            feature_names,
        }
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn test_row_count(&self) -> usize {
        self.test_row_count
    }

    /// Names of the columns each partition's matrices carry, in order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn get(&self, key: &PartitionKey) -> Option<&PartitionData> {
        self.partitions.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionData> {
        self.partitions.values()
    }
}

/// Splits the inputs by the values of `key_column`.
///
/// One partition is produced for every distinct key value in `x_train`,
/// including values that never occur in `x_test` (those partitions carry an
/// empty test matrix).
pub fn partition(
    x_train: &FeatureFrame,
    y_train: &[Label],
    x_test: &FeatureFrame,
    key_column: &KeyColumn,
) -> Result<Partitions, EnsembleError> {
    let key_index = resolve_key_column(x_train, key_column, "the training matrix")?;
    let test_key_index = resolve_key_column(x_test, key_column, "the test matrix")?;

    if x_train.names() != x_test.names() || key_index != test_key_index {
        return Err(SchemaMismatch::ColumnLayoutMismatch {
            train: x_train.names().iter().join(", "),
            test: x_test.names().iter().join(", "),
        }
        .into());
    }

    if x_train.n_rows() != y_train.len() {
        return Err(SchemaMismatch::RowCountMismatch {
            features: x_train.n_rows(),
            labels: y_train.len(),
        }
        .into());
    }

    let train_features = numeric_features(x_train, key_index)?;
    let test_features = numeric_features(x_test, key_index)?;

    let train_keys = key_values(&x_train.columns()[key_index], "the training matrix")?;
    let train_groups = group_rows(&train_keys);
    let test_keys = key_values(&x_test.columns()[key_index], "the test matrix")?;

    if let Some(key) = test_keys.iter().find(|key| !train_groups.contains_key(*key)) {
        return Err(EnsembleError::UnseenPartitionKey { key: key.clone() });
    }
    let test_groups = group_rows(&test_keys);

    let feature_names: Vec<String> = x_train
        .names()
        .iter()
        .enumerate()
        .filter(|&(index, _)| index != key_index)
        .map(|(_, name)| name.clone())
        .collect();

    let mut partitions = BTreeMap::new();
    for (key, train_rows) in train_groups {
        let test_row_positions = test_groups.get(&key).cloned().unwrap_or_default();
        let data = PartitionData {
            x_train: gather_rows(&train_features, &train_rows),
            y_train: train_rows.iter().map(|&row| y_train[row].clone()).collect(),
            x_test: gather_rows(&test_features, &test_row_positions),
            test_row_positions,
            key: key.clone(),
        };
        log::debug!(
            "Partition {key}: {} training rows, {} test rows",
            data.train_rows(),
            data.test_rows()
        );
        partitions.insert(key, data);
    }
    log::info!(
        "Split {} training rows and {} test rows into {} partitions by {key_column}",
        x_train.n_rows(),
        x_test.n_rows(),
        partitions.len()
    );

    Ok(Partitions {
        partitions,
        test_row_count: x_test.n_rows(),
        feature_names,
    })
}

fn resolve_key_column(
    frame: &FeatureFrame,
    key_column: &KeyColumn,
    matrix: &'static str,
) -> Result<usize, SchemaMismatch> {
    let index = match key_column {
        KeyColumn::Name(name) => frame.position(name),
        KeyColumn::Index(index) => Some(*index).filter(|&index| index < frame.n_columns()),
    };
    index.ok_or_else(|| SchemaMismatch::KeyColumnMissing {
        column: key_column.clone(),
        matrix,
    })
}

/// Borrows every non-key column as numeric data, in frame order.
fn numeric_features(
    frame: &FeatureFrame,
    key_index: usize,
) -> Result<Vec<&Array1<f64>>, SchemaMismatch> {
    frame
        .names()
        .iter()
        .zip(frame.columns())
        .enumerate()
        .filter(|&(index, _)| index != key_index)
        .map(|(_, (name, column))| match column {
            Column::Numeric(values) => Ok(values),
            Column::Categorical(_) => Err(SchemaMismatch::NonNumericFeature(name.clone())),
        })
        .collect()
}

fn key_values(column: &Column, matrix: &'static str) -> Result<Vec<PartitionKey>, SchemaMismatch> {
    match column {
        Column::Categorical(values) => Ok(values.iter().map(|v| PartitionKey::new(v.as_str())).collect()),
        Column::Numeric(values) => values
            .iter()
            .enumerate()
            .map(|(row, &v)| {
                if v.is_nan() {
                    Err(SchemaMismatch::NaNKey { matrix, row })
                } else {
                    Ok(PartitionKey::from_numeric(v))
                }
            })
            .collect(),
    }
}

/// Row indices per key, ascending within each key.
fn group_rows(keys: &[PartitionKey]) -> BTreeMap<PartitionKey, Vec<usize>> {
    let mut groups: BTreeMap<PartitionKey, Vec<usize>> = BTreeMap::new();
    for (row, key) in keys.iter().enumerate() {
        groups.entry(key.clone()).or_default().push(row);
    }
    groups
}

fn gather_rows(columns: &[&Array1<f64>], rows: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), columns.len()), |(r, c)| columns[c][rows[r]])
}
