use crate::types::{Label, PartitionKey};

/// Observer for reporting per-partition progress while the coordinator runs.
///
/// Callbacks may arrive from several worker threads at once and in any
/// partition order. They never influence the returned predictions.
pub trait PartitionObserver: Sync {
    fn on_partition_start(&self, key: &PartitionKey, train_rows: usize, test_rows: usize) {
        let _ = (key, train_rows, test_rows);
    }
    fn on_partition_complete(&self, key: &PartitionKey, predictions: &[Label]) {
        let _ = (key, predictions);
    }
    fn on_reassembled(&self, total_rows: usize) {
        let _ = total_rows;
    }
}

#[derive(Default)]
pub struct NoopPartitionProgress;

impl PartitionObserver for NoopPartitionProgress {}

/// Reports progress through the `log` facade at `info` level.
#[derive(Default)]
pub struct LogPartitionProgress;

impl PartitionObserver for LogPartitionProgress {
    fn on_partition_start(&self, key: &PartitionKey, train_rows: usize, test_rows: usize) {
        log::info!("Growing model for partition {key} ({train_rows} training rows, {test_rows} test rows)");
    }

    fn on_partition_complete(&self, key: &PartitionKey, predictions: &[Label]) {
        log::info!(
            "Finished partition {key} with {} predictions",
            predictions.len()
        );
    }

    fn on_reassembled(&self, total_rows: usize) {
        log::info!("All predictions made; reassembled {total_rows} rows");
    }
}

impl<T: PartitionObserver + ?Sized> PartitionObserver for &T {
    fn on_partition_start(&self, key: &PartitionKey, train_rows: usize, test_rows: usize) {
        (**self).on_partition_start(key, train_rows, test_rows);
    }
    fn on_partition_complete(&self, key: &PartitionKey, predictions: &[Label]) {
        (**self).on_partition_complete(key, predictions);
    }
    fn on_reassembled(&self, total_rows: usize) {
        (**self).on_reassembled(total_rows);
    }
}
