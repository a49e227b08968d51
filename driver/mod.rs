//! # Run Driver
//!
//! End-to-end run over the incident data: load the training and test tables,
//! engineer features, partition by the configured key column, grow one random
//! forest per partition and write the one-hot submission.

pub mod config;
pub mod data;
pub mod features;
pub mod submission;

use self::config::{ConfigError, RunConfig, RunMode};
use self::data::{DataError, load_columns};
use self::features::{FeatureEncoders, FeatureError, engineer, source_columns};
use self::submission::{SubmissionError, write_submission};
use crate::coordinator::EnsembleCoordinator;
use crate::error::EnsembleError;
use crate::forest::RandomForest;
use crate::partition::partition;
use crate::progress::PartitionObserver;
use crate::types::{KeyColumn, labels};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("Feature engineering failed for '{path}': {source}")]
    Features {
        path: PathBuf,
        #[source]
        source: FeatureError,
    },
    #[error(transparent)]
    Ensemble(#[from] EnsembleError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// What a completed run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: RunMode,
    pub train_rows: usize,
    pub test_rows: usize,
    pub partitions: usize,
    pub output: PathBuf,
}

pub fn run(
    config: &RunConfig,
    mode: RunMode,
    observer: &dyn PartitionObserver,
) -> Result<RunSummary, DriverError> {
    let started = Instant::now();
    let forest = config.forest_for(mode)?;
    let train_path = config.train_path(mode);
    let test_path = config.test_path(mode);
    log::info!(
        "Running in {mode:?} mode with {} trees per partition",
        forest.n_trees
    );

    let mut test_columns = vec![config.key_column.as_str()];
    test_columns.extend(source_columns());
    let mut train_columns = test_columns.clone();
    train_columns.push(config.label_column.as_str());

    let train_table = load_columns(&train_path, &train_columns)?;
    let test_table = load_columns(&test_path, &test_columns)?;

    let features_error = |path: &PathBuf| {
        let path = path.clone();
        move |source| DriverError::Features { path, source }
    };
    let encoders = FeatureEncoders::fit(&train_table).map_err(features_error(&train_path))?;
    let x_train = engineer(&train_table, &encoders, &config.key_column)
        .map_err(features_error(&train_path))?;
    let x_test = engineer(&test_table, &encoders, &config.key_column)
        .map_err(features_error(&test_path))?;
    let y_train = labels(
        train_table
            .column(&config.label_column)
            .unwrap_or_default()
            .iter()
            .map(String::as_str),
    );

    let partitions = partition(
        &x_train,
        &y_train,
        &x_test,
        &KeyColumn::name(config.key_column.as_str()),
    )?;

    let predictions = EnsembleCoordinator::new(observer)
        .with_execution(config.execution)
        .predict(&partitions, &|| RandomForest::new(forest.clone()))?;

    let output = config.data_dir.join(&config.output);
    write_submission(&output, &predictions)?;
    log::info!("Run finished in {:.2?}", started.elapsed());

    Ok(RunSummary {
        mode,
        train_rows: x_train.n_rows(),
        test_rows: x_test.n_rows(),
        partitions: partitions.len(),
        output,
    })
}
