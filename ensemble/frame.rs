//! # Feature Frames
//!
//! A `FeatureFrame` is the in-memory shape of an already-engineered feature
//! table: named columns of equal length, each either numeric or categorical.
//! Frames are immutable once built. The partitioner reads them through row
//! indices and never modifies the caller's data.

use ndarray::Array1;
use std::collections::HashSet;
use thiserror::Error;

/// A single named column of a `FeatureFrame`.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Numeric(Array1<f64>),
    Categorical(Vec<String>),
}

impl Column {
    pub fn numeric(values: impl Into<Vec<f64>>) -> Self {
        Self::Numeric(Array1::from(values.into()))
    }

    pub fn categorical<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Categorical(values.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }
}

/// Errors raised while assembling a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Column '{name}' has {found} rows, but the frame has {expected}.")]
    RaggedColumn {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Column '{0}' appears more than once.")]
    DuplicateColumn(String),
}

/// An ordered set of equally long, named feature columns.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl FeatureFrame {
    /// Builds a frame from `(name, column)` pairs, preserving their order.
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = (S, Column)>,
    ) -> Result<Self, FrameError> {
        let mut names = Vec::new();
        let mut data = Vec::new();
        let mut seen = HashSet::new();
        let mut n_rows = None;

        for (name, column) in columns {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(FrameError::DuplicateColumn(name));
            }
            let expected = *n_rows.get_or_insert(column.len());
            if column.len() != expected {
                return Err(FrameError::RaggedColumn {
                    name,
                    expected,
                    found: column.len(),
                });
            }
            names.push(name);
            data.push(column);
        }

        Ok(Self {
            names,
            columns: data,
            n_rows: n_rows.unwrap_or(0),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.position(name).and_then(|index| self.column(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_preserves_column_order() {
        let frame = FeatureFrame::new([
            ("district", Column::categorical(["north", "south"])),
            ("x", Column::numeric(vec![1.0, 2.0])),
        ])
        .unwrap();

        assert_eq!(frame.n_rows(), 2);
        assert_eq!(frame.n_columns(), 2);
        assert_eq!(frame.names(), ["district", "x"]);
        assert_eq!(frame.position("x"), Some(1));
        assert!(frame.column_by_name("x").unwrap().is_numeric());
        assert!(frame.column_by_name("missing").is_none());
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = FeatureFrame::new([
            ("a", Column::numeric(vec![1.0, 2.0])),
            ("b", Column::numeric(vec![1.0])),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            FrameError::RaggedColumn {
                name: "b".to_string(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = FeatureFrame::new([
            ("a", Column::numeric(vec![1.0])),
            ("a", Column::numeric(vec![2.0])),
        ])
        .unwrap_err();
        assert_eq!(err, FrameError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn empty_frame_has_no_rows() {
        let frame = FeatureFrame::new(Vec::<(String, Column)>::new()).unwrap();
        assert_eq!(frame.n_rows(), 0);
        assert_eq!(frame.n_columns(), 0);
    }
}
