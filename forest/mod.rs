//! # Random Forest Classifier
//!
//! A seeded CART random forest used as the per-partition model. Every tree
//! draws its bootstrap sample and per-node feature subsets from a generator
//! seeded with `seed + tree_index`, so a forest is fully determined by its
//! configuration and training data even though trees are grown in parallel.

pub mod tree;

use crate::model::Classifier;
use crate::types::Label;
use ndarray::parallel::prelude::*;
use ndarray::{ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tree::{DecisionTree, TreeParams, majority};

/// Seed shared by every partition's forest unless configured otherwise.
pub const DEFAULT_SEED: u64 = 782_629;

/// How many candidate features each split considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    /// `ceil(sqrt(n_features))`.
    Sqrt,
    All,
    Count(usize),
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let resolved = match self {
            Self::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            Self::All => n_features,
            Self::Count(0) => return Err(ForestError::InvalidMaxFeatures),
            Self::Count(count) => count.min(n_features),
        };
        Ok(resolved.min(n_features))
    }
}

/// Hyperparameters of a forest. Identical for every partition of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 10,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            seed: DEFAULT_SEED,
        }
    }
}

impl ForestConfig {
    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("Cannot fit a forest on an empty training set.")]
    EmptyTrainingSet,
    #[error("The training matrix has {rows} rows but {labels} labels were supplied.")]
    LabelCountMismatch { rows: usize, labels: usize },
    #[error("Non-finite feature value at row {row}, column {column}.")]
    NonFiniteFeature { row: usize, column: usize },
    #[error("A forest needs at least one tree.")]
    NoTrees,
    #[error("max_features must select at least one feature.")]
    InvalidMaxFeatures,
    #[error("The forest has not been fitted.")]
    NotFitted,
    #[error("The forest was fitted on {expected} features but received {found}.")]
    FeatureCountMismatch { expected: usize, found: usize },
}

#[derive(Clone, Debug, PartialEq)]
struct FittedForest {
    classes: Vec<Label>,
    trees: Vec<DecisionTree>,
    n_features: usize,
}

/// A bagged ensemble of CART trees voting on class labels.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomForest {
    config: ForestConfig,
    fitted: Option<FittedForest>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Distinct training labels in sorted order; empty before fitting.
    pub fn classes(&self) -> &[Label] {
        self.fitted
            .as_ref()
            .map(|fitted| fitted.classes.as_slice())
            .unwrap_or(&[])
    }

    pub fn trees(&self) -> &[DecisionTree] {
        self.fitted
            .as_ref()
            .map(|fitted| fitted.trees.as_slice())
            .unwrap_or(&[])
    }

    /// Per-class vote fractions for every row, columns ordered as `classes()`.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Vec<f64>>, ForestError> {
        let fitted = self.fitted_for(x)?;
        let n_trees = fitted.trees.len() as f64;
        Ok(fitted
            .votes(x)
            .into_iter()
            .map(|counts| counts.into_iter().map(|c| c as f64 / n_trees).collect())
            .collect())
    }

    fn fitted_for(&self, x: ArrayView2<'_, f64>) -> Result<&FittedForest, ForestError> {
        let fitted = self.fitted.as_ref().ok_or(ForestError::NotFitted)?;
        if x.ncols() != fitted.n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: fitted.n_features,
                found: x.ncols(),
            });
        }
        check_finite(x)?;
        Ok(fitted)
    }
}

impl FittedForest {
    fn votes(&self, x: ArrayView2<'_, f64>) -> Vec<Vec<usize>> {
        x.axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| {
                let mut counts = vec![0usize; self.classes.len()];
                for tree in &self.trees {
                    counts[tree.predict_row(row)] += 1;
                }
                counts
            })
            .collect()
    }
}

impl Classifier for RandomForest {
    type Error = ForestError;

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[Label]) -> Result<(), ForestError> {
        self.fitted = None;
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(ForestError::EmptyTrainingSet);
        }
        if n_samples != y.len() {
            return Err(ForestError::LabelCountMismatch {
                rows: n_samples,
                labels: y.len(),
            });
        }
        if self.config.n_trees == 0 {
            return Err(ForestError::NoTrees);
        }
        check_finite(x)?;

        let classes: Vec<Label> = y.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            max_features: self.config.max_features.resolve(n_features)?,
        };
        let seed = self.config.seed;
        let n_classes = classes.len();

        let trees: Vec<DecisionTree> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(tree_index as u64));
                let rows = (0..n_samples)
                    .map(|_| rng.gen_range(0..n_samples))
                    .collect();
                DecisionTree::grow(x, &encoded, n_classes, rows, params, &mut rng)
            })
            .collect();

        log::debug!(
            "Fitted {} trees on {n_samples} rows, {n_features} features, {n_classes} classes",
            trees.len()
        );

        self.fitted = Some(FittedForest {
            classes,
            trees,
            n_features,
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Label>, ForestError> {
        let fitted = self.fitted_for(x)?;
        Ok(fitted
            .votes(x)
            .into_iter()
            .map(|counts| fitted.classes[majority(&counts)].clone())
            .collect())
    }
}

fn check_finite(x: ArrayView2<'_, f64>) -> Result<(), ForestError> {
    match x.indexed_iter().find(|(_, value)| !value.is_finite()) {
        Some(((row, column), _)) => Err(ForestError::NonFiniteFeature { row, column }),
        None => Ok(()),
    }
}
