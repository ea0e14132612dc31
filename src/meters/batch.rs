//! Per-batch meters
//!
//! A [`BatchMeter`] pairs a [`BatchMetric`] (how one batch turns into a
//! [`BatchResult`]) with an [`Aggregator`] (how batch results fold into a
//! running value).

use super::aggregators::{Aggregator, Average, BatchResult};
use crate::error::Result;
use crate::Tensor;

/// Stateful metric fed one batch of predictions and targets at a time
///
/// Lifecycle: `reset` at the start of a measurement window, `measure` once per
/// batch, `value` any number of times.
pub trait Meter {
    /// Type of the aggregate value
    type Value;

    /// Start a new measurement window
    fn reset(&mut self);

    /// Fold one batch into the running state
    ///
    /// Inputs are validated before any state changes; on error the meter is
    /// left as it was.
    fn measure(&mut self, predictions: &Tensor, targets: &Tensor) -> Result<()>;

    /// Current aggregate over everything measured since the last reset
    fn value(&self) -> Result<Self::Value>;

    /// Name used as the key when reporting the value
    fn name(&self) -> &str;
}

/// Aggregator together with its current state
#[derive(Clone, Debug)]
pub struct Accumulator<A: Aggregator> {
    aggregator: A,
    state: A::State,
}

impl<A: Aggregator> Accumulator<A> {
    pub fn new(aggregator: A) -> Self {
        let state = aggregator.init();
        Self { aggregator, state }
    }

    pub fn reset(&mut self) {
        self.state = self.aggregator.init();
    }

    pub fn add(&mut self, result: BatchResult) {
        self.state = self.aggregator.combine(self.state.clone(), result);
    }

    pub fn value(&self) -> Result<f64> {
        self.aggregator.final_value(&self.state)
    }

    pub fn aggregator(&self) -> &A {
        &self.aggregator
    }
}

impl Default for Accumulator<Average> {
    fn default() -> Self {
        Self::new(Average)
    }
}

/// Extraction of a result from one batch
pub trait BatchMetric {
    /// Validate input shapes and types before anything is measured
    fn check_tensors(&self, _predictions: &Tensor, _targets: &Tensor) -> Result<()> {
        Ok(())
    }

    /// Compute the result for one batch
    fn get_result(&self, predictions: &Tensor, targets: &Tensor) -> Result<BatchResult>;

    /// Metric name
    fn name(&self) -> &str;
}

/// Generic batch meter: a metric folded through an aggregator
///
/// # Example
///
/// ```
/// use medidor::meters::{percentage, Average, BatchMeter, CategoricalAccuracy, Meter};
/// use medidor::Tensor;
///
/// let mut acc = BatchMeter::with_aggregator(CategoricalAccuracy, percentage(Average));
/// acc.measure(&Tensor::from_indices(vec![0, 1, 1]), &Tensor::from_indices(vec![0, 1, 2]))
///     .unwrap();
/// assert!((acc.value().unwrap() - 200.0 / 3.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct BatchMeter<M, A: Aggregator = Average> {
    metric: M,
    acc: Accumulator<A>,
}

impl<M: BatchMetric> BatchMeter<M, Average> {
    /// Create a meter that averages the metric over all samples
    pub fn new(metric: M) -> Self {
        Self::with_aggregator(metric, Average)
    }
}

impl<M: BatchMetric, A: Aggregator> BatchMeter<M, A> {
    pub fn with_aggregator(metric: M, aggregator: A) -> Self {
        Self {
            metric,
            acc: Accumulator::new(aggregator),
        }
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }
}

impl<M: BatchMetric, A: Aggregator> Meter for BatchMeter<M, A> {
    type Value = f64;

    fn reset(&mut self) {
        self.acc.reset();
    }

    fn measure(&mut self, predictions: &Tensor, targets: &Tensor) -> Result<()> {
        self.metric.check_tensors(predictions, targets)?;
        let result = self.metric.get_result(predictions, targets)?;
        self.acc.add(result);
        Ok(())
    }

    fn value(&self) -> Result<f64> {
        self.acc.value()
    }

    fn name(&self) -> &str {
        self.metric.name()
    }
}
