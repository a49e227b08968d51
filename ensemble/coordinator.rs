//! # Ensemble Coordinator
//!
//! Trains one fresh model per partition, predicts that partition's test rows
//! and writes every prediction back into the slot of the test row it came
//! from. Partitions share nothing after partitioning, so they are processed
//! as independent rayon tasks; the join of those tasks is the only
//! synchronisation point before reassembly.

use crate::error::{EnsembleError, ModelStage, ReassemblyError};
use crate::frame::FeatureFrame;
use crate::model::{Classifier, ModelFactory};
use crate::partition::{PartitionData, Partitions, partition};
use crate::progress::PartitionObserver;
use crate::types::{KeyColumn, Label, PartitionKey};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How per-partition work is scheduled. Both modes produce identical output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    #[default]
    Parallel,
    Sequential,
}

/// The predictions of one partition, each paired with its original test row.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionPredictions {
    pub key: PartitionKey,
    pub placements: Vec<(usize, Label)>,
}

/// Drives fit/predict for every partition and reassembles the results.
pub struct EnsembleCoordinator<'a> {
    execution: Execution,
    observer: &'a dyn PartitionObserver,
}

impl<'a> EnsembleCoordinator<'a> {
    pub fn new(observer: &'a dyn PartitionObserver) -> Self {
        Self {
            execution: Execution::default(),
            observer,
        }
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn execution(&self) -> Execution {
        self.execution
    }

    /// Predicts a label for every original test row.
    ///
    /// The returned vector has exactly `partitions.test_row_count()` entries,
    /// and entry `i` comes from the model trained on the partition of test row
    /// `i`. Any failure in any partition fails the whole call.
    pub fn predict<F: ModelFactory>(
        &self,
        partitions: &Partitions,
        model_factory: &F,
    ) -> Result<Vec<Label>, EnsembleError> {
        let started = Instant::now();
        let work: Vec<&PartitionData> = partitions.iter().collect();

        let results: Vec<Result<PartitionPredictions, EnsembleError>> = match self.execution {
            Execution::Parallel => work
                .par_iter()
                .map(|data| self.run_partition(data, model_factory))
                .collect(),
            Execution::Sequential => work
                .iter()
                .map(|data| self.run_partition(data, model_factory))
                .collect(),
        };

        // Results stay in key order, so the reported error does not depend on scheduling.
        let predictions = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        let output = reassemble(partitions.test_row_count(), predictions)?;

        log::debug!(
            "Predicted {} rows across {} partitions in {:.2?}",
            output.len(),
            partitions.len(),
            started.elapsed()
        );
        self.observer.on_reassembled(output.len());
        Ok(output)
    }

    fn run_partition<F: ModelFactory>(
        &self,
        data: &PartitionData,
        model_factory: &F,
    ) -> Result<PartitionPredictions, EnsembleError> {
        let key = &data.key;
        if data.test_rows() == 0 {
            log::debug!("Partition {key} has no test rows; skipping model training");
            return Ok(PartitionPredictions {
                key: key.clone(),
                placements: Vec::new(),
            });
        }
        if data.train_rows() == 0 {
            return Err(EnsembleError::EmptyPartitionTraining { key: key.clone() });
        }

        self.observer
            .on_partition_start(key, data.train_rows(), data.test_rows());

        let mut model = model_factory.create();
        model
            .fit(data.x_train.view(), &data.y_train)
            .map_err(|err| model_failure(key, ModelStage::Fit, err))?;
        let predicted = model
            .predict(data.x_test.view())
            .map_err(|err| model_failure(key, ModelStage::Predict, err))?;

        if predicted.len() != data.test_row_positions.len() {
            return Err(EnsembleError::PredictionCountMismatch {
                key: key.clone(),
                expected: data.test_row_positions.len(),
                found: predicted.len(),
            });
        }

        self.observer.on_partition_complete(key, &predicted);

        Ok(PartitionPredictions {
            key: key.clone(),
            placements: data
                .test_row_positions
                .iter()
                .copied()
                .zip(predicted)
                .collect(),
        })
    }
}

fn model_failure<E>(key: &PartitionKey, stage: ModelStage, err: E) -> EnsembleError
where
    E: std::error::Error + Send + Sync + 'static,
{
    log::warn!("Model for partition {key} failed during {stage}: {err}");
    EnsembleError::ModelFitFailure {
        key: key.clone(),
        stage,
        source: Box::new(err),
    }
}

/// Writes every placement into a buffer with one slot per original test row.
///
/// Each slot must be written exactly once; a second write, an out-of-range
/// position or a slot left empty is an error rather than a corrupt vector.
pub fn reassemble(
    test_row_count: usize,
    predictions: impl IntoIterator<Item = PartitionPredictions>,
) -> Result<Vec<Label>, ReassemblyError> {
    let mut slots: Vec<Option<Label>> = vec![None; test_row_count];

    for PartitionPredictions { key, placements } in predictions {
        for (position, label) in placements {
            let slot = slots
                .get_mut(position)
                .ok_or_else(|| ReassemblyError::PositionOutOfRange {
                    key: key.clone(),
                    position,
                    len: test_row_count,
                })?;
            if slot.is_some() {
                return Err(ReassemblyError::SlotWrittenTwice {
                    key: key.clone(),
                    position,
                });
            }
            *slot = Some(label);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| slot.ok_or(ReassemblyError::SlotUnfilled { position }))
        .collect()
}

/// Partitions the inputs by `key_column` and predicts every test row.
pub fn run_partitioned<F: ModelFactory>(
    x_train: &FeatureFrame,
    y_train: &[Label],
    x_test: &FeatureFrame,
    key_column: &KeyColumn,
    model_factory: &F,
    observer: &dyn PartitionObserver,
) -> Result<Vec<Label>, EnsembleError> {
    let partitions = partition(x_train, y_train, x_test, key_column)?;
    EnsembleCoordinator::new(observer).predict(&partitions, model_factory)
}
