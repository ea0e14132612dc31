//! Supervised training loop
//!
//! This module drives meters through epochs and steps:
//! - Trainer abstraction over a user-supplied [`Model`]
//! - Training configuration
//! - Callbacks (early stopping, progress logging, CSV export)
//!
//! # Example
//!
//! ```no_run
//! use medidor::meters::{BatchMeter, CategoricalAccuracy};
//! use medidor::train::{Batch, Model, StepOutput, TrainConfig, Trainer};
//! use medidor::Result;
//!
//! struct Fixed;
//!
//! impl Model for Fixed {
//!     fn train_step(&mut self, batch: &Batch) -> Result<StepOutput> {
//!         Ok(StepOutput { predictions: batch.inputs.clone(), loss: 1.0 })
//!     }
//!     fn eval_step(&mut self, batch: &Batch) -> Result<StepOutput> {
//!         self.train_step(batch)
//!     }
//! }
//!
//! let config = TrainConfig::load("medidor.yaml")?;
//! let mut trainer = Trainer::new(Fixed, config);
//! trainer.add_meter("acc", BatchMeter::new(CategoricalAccuracy));
//!
//! let train: Vec<Batch> = vec![];
//! let valid: Vec<Batch> = vec![];
//! let result = trainer.train_with_validation(|| train.clone(), || valid.clone())?;
//! println!("{:?}", result.last_stats);
//! # Ok::<(), medidor::Error>(())
//! ```

pub mod callback;
mod config;
mod export;
mod trainer;

pub use callback::{
    CallbackAction, CallbackContext, CallbackManager, EarlyStopping, ProgressLogger,
    TrainerCallback,
};
pub use config::{CsvExportConfig, TrainConfig};
pub use export::CsvExporter;
pub use trainer::{Batch, Model, ScalarMeter, StepOutput, TrainResult, Trainer};
