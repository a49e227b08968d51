//! # Delimited Input Loading
//!
//! Reads comma-separated files with a header row and keeps only the columns
//! a run asks for, as raw strings. Interpretation of those strings belongs to
//! the feature-engineering step.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("The required column '{column}' was not found in '{path}'.")]
    ColumnNotFound { path: PathBuf, column: String },
    #[error("'{path}' contains no data rows.")]
    Empty { path: PathBuf },
}

/// Selected columns of a delimited file, in the order they were requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTable {
    path: PathBuf,
    names: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl RawTable {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| self.columns[index].as_slice())
    }
}

/// Loads `columns` from the CSV file at `path`.
pub fn load_columns(path: &Path, columns: &[&str]) -> Result<RawTable, DataError> {
    let csv_error = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    let indices = columns
        .iter()
        .map(|&column| {
            headers
                .iter()
                .position(|header| header == column)
                .ok_or_else(|| DataError::ColumnNotFound {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut data: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        for (values, &index) in data.iter_mut().zip(&indices) {
            values.push(record.get(index).unwrap_or_default().to_string());
        }
    }

    let table = RawTable {
        path: path.to_path_buf(),
        names: columns.iter().map(|column| column.to_string()).collect(),
        columns: data,
    };
    if table.n_rows() == 0 {
        return Err(DataError::Empty {
            path: path.to_path_buf(),
        });
    }

    log::info!(
        "Loaded {} rows ({} columns) from {}",
        table.n_rows(),
        columns.len(),
        path.display()
    );
    Ok(table)
}
