//! Running metrics
//!
//! - **aggregators**: how per-batch results fold into a running value
//! - **batch**: generic per-batch meter and the `Meter` trait
//! - **accuracy**: categorical and binary accuracy
//! - **confusion_matrix**: fixed and resizable confusion matrices
//!
//! # Example
//!
//! ```
//! use medidor::meters::{percentage, Average, BatchMeter, CategoricalAccuracy, Meter};
//! use medidor::Tensor;
//! use ndarray::array;
//!
//! let mut acc = BatchMeter::with_aggregator(CategoricalAccuracy, percentage(Average));
//! acc.reset();
//! let scores = Tensor::from_scores(array![[0.2, 0.8], [0.9, 0.1]]);
//! acc.measure(&scores, &Tensor::from_indices(vec![1, 1])).unwrap();
//! assert_eq!(acc.value().unwrap(), 50.0);
//! ```

mod accuracy;
mod aggregators;
mod batch;
pub mod confusion_matrix;

pub use accuracy::{BinaryAccuracy, CategoricalAccuracy};
pub use aggregators::{percentage, Aggregator, Average, BatchResult, MovingAverage, Percentage};
pub use batch::{Accumulator, BatchMeter, BatchMetric, Meter};
pub use confusion_matrix::{
    ConfusionMatrix, ConfusionMatrixController, FixedConfusionMatrixController, NrClasses,
    ResizableConfusionMatrixController, MAX_AUTO_CLASSES,
};
