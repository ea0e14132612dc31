//! Accuracy metrics for classification
//!
//! - **CategoricalAccuracy**: fraction where argmax(pred) == target
//! - **BinaryAccuracy**: fraction where (pred >= threshold) == target

use super::aggregators::BatchResult;
use super::batch::BatchMetric;
use crate::error::{Error, Result};
use crate::Tensor;

fn check_lengths(predictions: &Tensor, targets: &Tensor) -> Result<()> {
    if predictions.len() != targets.len() {
        return Err(Error::InvalidLengths {
            predictions: predictions.len(),
            targets: targets.len(),
        });
    }
    Ok(())
}

/// Categorical accuracy for multi-class classification
///
/// Predictions are either `[N, C]` scores (reduced with argmax) or `[N]` class
/// indices. Targets are `[N]` class indices.
#[derive(Clone, Copy, Debug, Default)]
pub struct CategoricalAccuracy;

impl CategoricalAccuracy {
    fn predicted_classes(predictions: &Tensor) -> Option<Tensor> {
        match predictions.ndim() {
            2 => predictions.argmax(),
            _ => Some(predictions.clone()),
        }
    }
}

impl BatchMetric for CategoricalAccuracy {
    fn check_tensors(&self, predictions: &Tensor, targets: &Tensor) -> Result<()> {
        match predictions.ndim() {
            1 if !predictions.is_integer() => {
                return Err(Error::InvalidInputType {
                    dtype: predictions.dtype(),
                })
            }
            1 | 2 => {}
            dims => return Err(Error::InvalidBatchDimension { dims }),
        }
        if targets.ndim() != 1 {
            return Err(Error::InvalidBatchDimension {
                dims: targets.ndim(),
            });
        }
        if !targets.is_integer() {
            return Err(Error::InvalidInputType {
                dtype: targets.dtype(),
            });
        }
        check_lengths(predictions, targets)
    }

    fn get_result(&self, predictions: &Tensor, targets: &Tensor) -> Result<BatchResult> {
        let classes = Self::predicted_classes(predictions).ok_or(Error::InvalidBatchDimension {
            dims: predictions.ndim(),
        })?;
        let (Some(pred), Some(target)) = (classes.as_indices(), targets.as_indices()) else {
            return Err(Error::InvalidInputType {
                dtype: targets.dtype(),
            });
        };

        let correct = pred.iter().zip(target.iter()).filter(|(p, t)| p == t).count();
        Ok(BatchResult::new(correct as f64, target.len() as f64))
    }

    fn name(&self) -> &str {
        "acc"
    }
}

/// Accuracy for binary classification with a decision threshold
#[derive(Clone, Copy, Debug)]
pub struct BinaryAccuracy {
    threshold: f32,
}

impl BinaryAccuracy {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for BinaryAccuracy {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl BatchMetric for BinaryAccuracy {
    fn check_tensors(&self, predictions: &Tensor, targets: &Tensor) -> Result<()> {
        for t in [predictions, targets] {
            if t.ndim() != 1 {
                return Err(Error::InvalidBatchDimension { dims: t.ndim() });
            }
        }
        check_lengths(predictions, targets)
    }

    fn get_result(&self, predictions: &Tensor, targets: &Tensor) -> Result<BatchResult> {
        let threshold = f64::from(self.threshold);
        let correct = predictions
            .to_f64_vec()
            .into_iter()
            .zip(targets.to_f64_vec())
            .filter(|&(p, t)| {
                let pred_class = if p >= threshold { 1.0 } else { 0.0 };
                (pred_class - t).abs() < 0.5
            })
            .count();
        Ok(BatchResult::new(correct as f64, predictions.len() as f64))
    }

    fn name(&self) -> &str {
        "binary_acc"
    }
}
