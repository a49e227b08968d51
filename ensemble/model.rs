use crate::types::Label;
use ndarray::ArrayView2;
use std::error::Error;

/// The opaque learning capability trained once per partition.
///
/// Implementations receive feature matrices that never contain the partition
/// key column. `predict` must return exactly one label per input row, in row
/// order.
pub trait Classifier: Send {
    type Error: Error + Send + Sync + 'static;

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[Label]) -> Result<(), Self::Error>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Label>, Self::Error>;
}

/// Produces fresh, untrained classifiers that are configured identically,
/// including their random seed, so every partition starts from the same state.
pub trait ModelFactory: Sync {
    type Model: Classifier;

    fn create(&self) -> Self::Model;
}

impl<F, M> ModelFactory for F
where
    F: Fn() -> M + Sync,
    M: Classifier,
{
    type Model = M;

    fn create(&self) -> M {
        self()
    }
}
