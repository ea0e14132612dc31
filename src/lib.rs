//! # Medidor: Running Metrics for Supervised Training
//!
//! Medidor accumulates per-batch statistics into running values and dispatches
//! them to training observers.
//!
//! ## Architecture
//!
//! - **meters**: aggregators, batch meters, accuracy, confusion matrices
//! - **train**: callbacks, CSV export, configuration and the supervised trainer
//! - **tensor**: the minimal typed tensor meters consume
//! - **cli**: the `medidor` command line

pub mod cli;
pub mod meters;
pub mod tensor;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};
pub use meters::{ConfusionMatrix, Meter};
pub use tensor::Tensor;
