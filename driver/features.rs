//! # Feature Engineering
//!
//! Turns raw incident records into the numeric feature frame the pipeline
//! consumes. The partition key column is carried through untouched as a
//! categorical column; every other column becomes numeric:
//!
//! - `DayOfWeek`: code from a category encoder fitted on the training rows.
//! - `Dates` (`YYYY-MM-DD HH:MM:SS`): split into `Date` (Julian day number)
//!   and `Time` (minutes after midnight).
//! - `X`, `Y`: parsed as floating-point coordinates.

use super::data::RawTable;
use crate::frame::{Column, FeatureFrame, FrameError};
use ahash::AHashMap;
use std::collections::BTreeSet;
use thiserror::Error;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

pub const DATES_COLUMN: &str = "Dates";
pub const DAY_OF_WEEK_COLUMN: &str = "DayOfWeek";
pub const X_COLUMN: &str = "X";
pub const Y_COLUMN: &str = "Y";

/// Engineered feature columns, in the order they follow the key column.
pub const FEATURE_COLUMNS: [&str; 5] = ["DayOfWeek", "Date", "Time", "X", "Y"];

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("Column '{0}' is missing from the loaded table.")]
    MissingColumn(String),
    #[error("Row {row}: '{value}' in column '{column}' is not a finite number.")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Row {row}: '{value}' is not a timestamp of the form YYYY-MM-DD HH:MM:SS.")]
    InvalidTimestamp { row: usize, value: String },
    #[error("Value '{value}' in column '{column}' never occurs in the training data.")]
    UnseenCategory { column: String, value: String },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Maps the distinct training values of one column to dense numeric codes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryEncoder {
    column: String,
    codes: AHashMap<String, usize>,
}

impl CategoryEncoder {
    /// Codes follow the sorted order of the distinct values.
    pub fn fit(column: &str, values: &[String]) -> Self {
        let distinct: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        Self {
            column: column.to_string(),
            codes: distinct
                .into_iter()
                .enumerate()
                .map(|(code, value)| (value.to_string(), code))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn encode(&self, value: &str) -> Result<f64, FeatureError> {
        self.codes
            .get(value)
            .map(|&code| code as f64)
            .ok_or_else(|| FeatureError::UnseenCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }
}

/// Encoders fitted on the training table and reused for the test table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureEncoders {
    pub day_of_week: CategoryEncoder,
}

impl FeatureEncoders {
    pub fn fit(training: &RawTable) -> Result<Self, FeatureError> {
        Ok(Self {
            day_of_week: CategoryEncoder::fit(
                DAY_OF_WEEK_COLUMN,
                required(training, DAY_OF_WEEK_COLUMN)?,
            ),
        })
    }
}

/// Raw columns feature engineering reads, besides the key column.
pub fn source_columns() -> [&'static str; 4] {
    [DATES_COLUMN, DAY_OF_WEEK_COLUMN, X_COLUMN, Y_COLUMN]
}

/// Builds `[key, DayOfWeek, Date, Time, X, Y]` from a raw table.
pub fn engineer(
    table: &RawTable,
    encoders: &FeatureEncoders,
    key_column: &str,
) -> Result<FeatureFrame, FeatureError> {
    let keys = required(table, key_column)?.to_vec();

    let day_of_week = required(table, DAY_OF_WEEK_COLUMN)?
        .iter()
        .map(|value| encoders.day_of_week.encode(value))
        .collect::<Result<Vec<_>, _>>()?;

    let (dates, times): (Vec<f64>, Vec<f64>) = required(table, DATES_COLUMN)?
        .iter()
        .enumerate()
        .map(|(row, value)| split_timestamp(row, value))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .unzip();

    let x = parse_numeric(table, X_COLUMN)?;
    let y = parse_numeric(table, Y_COLUMN)?;

    let frame = FeatureFrame::new([
        (key_column, Column::Categorical(keys)),
        (FEATURE_COLUMNS[0], Column::numeric(day_of_week)),
        (FEATURE_COLUMNS[1], Column::numeric(dates)),
        (FEATURE_COLUMNS[2], Column::numeric(times)),
        (FEATURE_COLUMNS[3], Column::numeric(x)),
        (FEATURE_COLUMNS[4], Column::numeric(y)),
    ])?;
    log::debug!(
        "Engineered {} rows from {}",
        frame.n_rows(),
        table.path().display()
    );
    Ok(frame)
}

/// `(julian_day, minutes_after_midnight)` for one timestamp.
pub fn split_timestamp(row: usize, value: &str) -> Result<(f64, f64), FeatureError> {
    let parsed = PrimitiveDateTime::parse(value.trim(), TIMESTAMP_FORMAT).map_err(|_| {
        FeatureError::InvalidTimestamp {
            row,
            value: value.to_string(),
        }
    })?;
    let date = f64::from(parsed.date().to_julian_day());
    let time = parsed.time();
    let minutes = f64::from(time.hour()) * 60.0
        + f64::from(time.minute())
        + f64::from(time.second()) / 60.0;
    Ok((date, minutes))
}

fn required<'a>(table: &'a RawTable, column: &str) -> Result<&'a [String], FeatureError> {
    table
        .column(column)
        .ok_or_else(|| FeatureError::MissingColumn(column.to_string()))
}

fn parse_numeric(table: &RawTable, column: &str) -> Result<Vec<f64>, FeatureError> {
    required(table, column)?
        .iter()
        .enumerate()
        .map(|(row, value)| match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(number),
            _ => Err(FeatureError::InvalidNumber {
                column: column.to_string(),
                row,
                value: value.clone(),
            }),
        })
        .collect()
}
