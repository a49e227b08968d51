#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod coordinator;
pub mod error;
pub mod frame;
pub mod model;
pub mod partition;
pub mod progress;
pub mod types;

#[path = "../forest/mod.rs"]
pub mod forest;

#[path = "../driver/mod.rs"]
pub mod driver;

pub use coordinator::{
    EnsembleCoordinator, Execution, PartitionPredictions, reassemble, run_partitioned,
};
pub use error::{EnsembleError, ModelStage, ReassemblyError, SchemaMismatch};
pub use frame::{Column, FeatureFrame, FrameError};
pub use model::{Classifier, ModelFactory};
pub use partition::{PartitionData, Partitions, partition};
pub use progress::{LogPartitionProgress, NoopPartitionProgress, PartitionObserver};
pub use types::{KeyColumn, Label, PartitionKey};
