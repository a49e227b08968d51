//! Writes reassembled predictions as a one-hot submission table.
//!
//! One row per test row, in test-row order. The first column is the 0-based
//! `Id`, followed by one indicator column per crime category.

use crate::types::Label;
use ahash::AHashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Every category a prediction may name, in submission column order.
pub const CRIME_CATEGORIES: [&str; 39] = [
    "ARSON",
    "ASSAULT",
    "BAD CHECKS",
    "BRIBERY",
    "BURGLARY",
    "DISORDERLY CONDUCT",
    "DRIVING UNDER THE INFLUENCE",
    "DRUG/NARCOTIC",
    "DRUNKENNESS",
    "EMBEZZLEMENT",
    "EXTORTION",
    "FAMILY OFFENSES",
    "FORGERY/COUNTERFEITING",
    "FRAUD",
    "GAMBLING",
    "KIDNAPPING",
    "LARCENY/THEFT",
    "LIQUOR LAWS",
    "LOITERING",
    "MISSING PERSON",
    "NON-CRIMINAL",
    "OTHER OFFENSES",
    "PORNOGRAPHY/OBSCENE MAT",
    "PROSTITUTION",
    "RECOVERED VEHICLE",
    "ROBBERY",
    "RUNAWAY",
    "SECONDARY CODES",
    "SEX OFFENSES FORCIBLE",
    "SEX OFFENSES NON FORCIBLE",
    "STOLEN PROPERTY",
    "SUICIDE",
    "SUSPICIOUS OCC",
    "TREA",
    "TRESPASS",
    "VANDALISM",
    "VEHICLE THEFT",
    "WARRANTS",
    "WEAPON LAWS",
];

pub const ID_COLUMN: &str = "Id";

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Prediction for row {row} is '{label}', which is not a known crime category.")]
    UnknownLabel { row: usize, label: Label },
    #[error("Failed to write submission '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to flush submission '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes `predictions` to `path`, replacing any existing file.
pub fn write_submission(path: &Path, predictions: &[Label]) -> Result<(), SubmissionError> {
    let columns: AHashMap<&str, usize> = CRIME_CATEGORIES
        .iter()
        .enumerate()
        .map(|(index, &name)| (name, index))
        .collect();

    // Validate before touching the output file.
    let hot = predictions
        .iter()
        .enumerate()
        .map(|(row, label)| {
            columns
                .get(label.as_str())
                .copied()
                .ok_or_else(|| SubmissionError::UnknownLabel {
                    row,
                    label: label.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let csv_error = |source| SubmissionError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;

    let mut header = Vec::with_capacity(CRIME_CATEGORIES.len() + 1);
    header.push(ID_COLUMN);
    header.extend(CRIME_CATEGORIES);
    writer.write_record(&header).map_err(csv_error)?;

    let mut record = vec![String::new(); CRIME_CATEGORIES.len() + 1];
    for (row, &column) in hot.iter().enumerate() {
        record[0] = row.to_string();
        for (index, cell) in record[1..].iter_mut().enumerate() {
            let indicator = if index == column { "1" } else { "0" };
            indicator.clone_into(cell);
        }
        writer.write_record(&record).map_err(csv_error)?;
    }

    writer.flush().map_err(|source| SubmissionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Wrote {} predictions to {}",
        predictions.len(),
        path.display()
    );
    Ok(())
}
