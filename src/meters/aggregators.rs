//! Aggregation strategies for per-batch results
//!
//! An aggregator decides how a stream of batch results reduces to one running
//! value. It holds no running state itself: the state is produced by
//! [`Aggregator::init`], threaded through [`Aggregator::combine`] by the owner
//! and read with [`Aggregator::final_value`].
//!
//! - **Average**: mean over all samples, independent of batch grouping
//! - **MovingAverage**: exponential moving average of batch means
//! - **Percentage**: wraps another aggregator and scales its value by 100

use crate::error::{Error, Result};

/// Result of measuring one batch: a partial sum and the samples it covers
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchResult {
    /// Sum of per-sample values
    pub total: f64,
    /// Number of samples in the sum
    pub count: f64,
}

impl BatchResult {
    pub fn new(total: f64, count: f64) -> Self {
        Self { total, count }
    }

    /// A single observation
    pub fn scalar(value: f64) -> Self {
        Self::new(value, 1.0)
    }

    /// Sum and length of a slice of per-sample values
    pub fn from_values(values: &[f64]) -> Self {
        Self::new(values.iter().sum(), values.len() as f64)
    }

    /// Mean of the batch, `None` when it covers no samples
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0.0).then(|| self.total / self.count)
    }
}

/// Strategy combining batch results into a running value
pub trait Aggregator {
    /// Accumulator state
    type State: Clone + std::fmt::Debug;

    /// Fresh state for a new measurement window
    fn init(&self) -> Self::State;

    /// Fold one batch result into the state
    fn combine(&self, state: Self::State, result: BatchResult) -> Self::State;

    /// Read the aggregate value
    ///
    /// Fails with [`Error::ZeroMeasurements`] when nothing has been folded.
    fn final_value(&self, state: &Self::State) -> Result<f64>;
}

// =============================================================================
// Average
// =============================================================================

/// Running sum / running count
///
/// # Example
///
/// ```
/// use medidor::meters::{Aggregator, Average, BatchResult};
///
/// let avg = Average;
/// let state = avg.combine(avg.init(), BatchResult::from_values(&[1.0, 2.0]));
/// let state = avg.combine(state, BatchResult::from_values(&[3.0, 4.0]));
/// assert_eq!(avg.final_value(&state).unwrap(), 2.5);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Average;

impl Aggregator for Average {
    type State = BatchResult;

    fn init(&self) -> BatchResult {
        BatchResult::default()
    }

    fn combine(&self, state: BatchResult, result: BatchResult) -> BatchResult {
        BatchResult::new(state.total + result.total, state.count + result.count)
    }

    fn final_value(&self, state: &BatchResult) -> Result<f64> {
        state.mean().ok_or(Error::ZeroMeasurements)
    }
}

// =============================================================================
// Moving Average
// =============================================================================

/// Exponential moving average over batch means
///
/// The first batch sets the value; each later batch moves it towards the new
/// batch mean by `1 - momentum`. Empty batches are ignored.
#[derive(Clone, Copy, Debug)]
pub struct MovingAverage {
    momentum: f64,
}

impl MovingAverage {
    /// Create a moving average, `momentum` must lie in `[0, 1)`
    pub fn new(momentum: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&momentum) {
            return Err(Error::Config(format!(
                "moving average momentum must be in [0, 1), got {momentum}"
            )));
        }
        Ok(Self { momentum })
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }
}

impl Aggregator for MovingAverage {
    type State = Option<f64>;

    fn init(&self) -> Option<f64> {
        None
    }

    fn combine(&self, state: Option<f64>, result: BatchResult) -> Option<f64> {
        let Some(x) = result.mean() else {
            return state;
        };
        Some(match state {
            Some(v) => self.momentum * v + (1.0 - self.momentum) * x,
            None => x,
        })
    }

    fn final_value(&self, state: &Option<f64>) -> Result<f64> {
        state.ok_or(Error::ZeroMeasurements)
    }
}

// =============================================================================
// Percentage scaling
// =============================================================================

/// Scales the value of the wrapped aggregator by 100
///
/// Accumulation is delegated unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Percentage<A> {
    inner: A,
}

impl<A: Aggregator> Percentage<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: Aggregator> Aggregator for Percentage<A> {
    type State = A::State;

    fn init(&self) -> A::State {
        self.inner.init()
    }

    fn combine(&self, state: A::State, result: BatchResult) -> A::State {
        self.inner.combine(state, result)
    }

    fn final_value(&self, state: &A::State) -> Result<f64> {
        Ok(self.inner.final_value(state)? * 100.0)
    }
}

/// Wrap an aggregator so its value is reported as a percentage
pub fn percentage<A: Aggregator>(inner: A) -> Percentage<A> {
    Percentage::new(inner)
}
