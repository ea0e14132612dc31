//! Supervised trainer driving meters and callbacks

use super::callback::{CallbackAction, CallbackContext, CallbackManager, TrainerCallback};
use super::export::CsvExporter;
use super::TrainConfig;
use crate::error::Result;
use crate::meters::{Accumulator, Average, BatchResult, Meter};
use crate::Tensor;
use std::collections::BTreeMap;

/// One batch of inputs and targets
#[derive(Clone, Debug)]
pub struct Batch {
    pub inputs: Tensor,
    pub targets: Tensor,
}

impl Batch {
    pub fn new(inputs: Tensor, targets: Tensor) -> Self {
        Self { inputs, targets }
    }
}

/// What the model reports for one batch
#[derive(Clone, Debug)]
pub struct StepOutput {
    /// Predictions for the batch (scores or class indices)
    pub predictions: Tensor,
    /// Scalar loss for the batch
    pub loss: f64,
}

/// Model, loss and optimizer as seen by the trainer
///
/// Forward passes, gradients and parameter updates all happen behind this
/// trait; the trainer only consumes the predictions and loss.
pub trait Model {
    /// Forward, backward and optimizer step on one batch
    fn train_step(&mut self, batch: &Batch) -> Result<StepOutput>;

    /// Forward pass without updating parameters
    fn eval_step(&mut self, batch: &Batch) -> Result<StepOutput>;
}

/// Meter reporting a scalar, as stored by the trainer
pub type ScalarMeter = Box<dyn Meter<Value = f64>>;

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainResult {
    /// Epochs fully completed
    pub epochs_trained: usize,
    /// Training steps taken
    pub steps: usize,
    /// Whether a callback stopped training
    pub stopped_early: bool,
    /// Stats reported at the last log event or epoch end
    pub last_stats: BTreeMap<String, f64>,
}

/// High-level trainer that orchestrates the epoch/step loop
///
/// # Example
///
/// ```no_run
/// use medidor::meters::{percentage, Average, BatchMeter, CategoricalAccuracy};
/// use medidor::train::{Batch, Model, ProgressLogger, StepOutput, TrainConfig, Trainer};
/// use medidor::Result;
///
/// struct Classifier;
///
/// impl Model for Classifier {
///     fn train_step(&mut self, batch: &Batch) -> Result<StepOutput> {
///         self.eval_step(batch)
///     }
///     fn eval_step(&mut self, batch: &Batch) -> Result<StepOutput> {
///         Ok(StepOutput { predictions: batch.inputs.clone(), loss: 0.0 })
///     }
/// }
///
/// let mut trainer = Trainer::new(Classifier, TrainConfig::new().with_epochs(5));
/// trainer.add_meter("acc", BatchMeter::with_aggregator(CategoricalAccuracy, percentage(Average)));
/// trainer.add_callback(ProgressLogger::new());
///
/// let batches: Vec<Batch> = vec![];
/// let result = trainer.train(|| batches.clone())?;
/// println!("trained {} epochs", result.epochs_trained);
/// # Ok::<(), medidor::Error>(())
/// ```
pub struct Trainer<M> {
    model: M,
    config: TrainConfig,
    loss: Accumulator<Average>,
    meters: Vec<(String, ScalarMeter)>,
    callbacks: CallbackManager,
    epochs_trained: usize,
    global_step: usize,
    last_stats: BTreeMap<String, f64>,
}

impl<M: Model> Trainer<M> {
    /// Create a new trainer
    ///
    /// A [`CsvExporter`] is registered when the configuration asks for export.
    pub fn new(model: M, config: TrainConfig) -> Self {
        let mut callbacks = CallbackManager::new();
        if let Some(export) = &config.export {
            callbacks.add(CsvExporter::from_config(export));
        }
        Self {
            model,
            config,
            loss: Accumulator::default(),
            meters: Vec::new(),
            callbacks,
            epochs_trained: 0,
            global_step: 0,
            last_stats: BTreeMap::new(),
        }
    }

    /// Register a meter reported under `name`
    pub fn add_meter<T>(&mut self, name: impl Into<String>, meter: T)
    where
        T: Meter<Value = f64> + 'static,
    {
        self.meters.push((name.into(), Box::new(meter)));
    }

    /// Add a callback to the trainer
    pub fn add_callback<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    /// Stat names reported during training, without validation stats
    pub fn meter_names(&self) -> Vec<String> {
        std::iter::once("loss".to_string())
            .chain(self.meters.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    /// Stats from the last log event or epoch end
    pub fn last_stats(&self) -> &BTreeMap<String, f64> {
        &self.last_stats
    }

    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Get reference to callback manager
    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    /// Train for `config.epochs` epochs
    ///
    /// `batches` is called once per epoch.
    pub fn train<B, I>(&mut self, batches: B) -> Result<TrainResult>
    where
        B: FnMut() -> I,
        I: IntoIterator<Item = Batch>,
    {
        self.run(batches, None::<fn() -> Vec<Batch>>)
    }

    /// Train with a validation pass at the end of every epoch
    pub fn train_with_validation<B, I, V, J>(
        &mut self,
        batches: B,
        valid_batches: V,
    ) -> Result<TrainResult>
    where
        B: FnMut() -> I,
        I: IntoIterator<Item = Batch>,
        V: FnMut() -> J,
        J: IntoIterator<Item = Batch>,
    {
        self.run(batches, Some(valid_batches))
    }

    fn context(&self, step: usize, stats: BTreeMap<String, f64>, names: &[String]) -> CallbackContext {
        CallbackContext {
            epoch: self.epochs_trained,
            max_epochs: self.config.epochs,
            step,
            global_step: self.global_step,
            stats,
            meter_names: names.to_vec(),
        }
    }

    fn reset_meters(&mut self) {
        self.loss.reset();
        for (_, meter) in &mut self.meters {
            meter.reset();
        }
    }

    fn measure(&mut self, batch: &Batch, output: &StepOutput) -> Result<()> {
        for (_, meter) in &mut self.meters {
            meter.measure(&output.predictions, &batch.targets)?;
        }
        self.loss.add(BatchResult::scalar(output.loss));
        Ok(())
    }

    /// Current value of every meter; unavailable values are left out
    fn collect_stats(&self, prefix: &str, stats: &mut BTreeMap<String, f64>) {
        let values = std::iter::once(("loss", self.loss.value()))
            .chain(self.meters.iter().map(|(name, m)| (name.as_str(), m.value())));
        for (name, value) in values {
            match value {
                Ok(v) => {
                    stats.insert(format!("{prefix}{name}"), v);
                }
                Err(e) => log::debug!("stat '{prefix}{name}' unavailable: {e}"),
            }
        }
    }

    fn validate<V, J>(&mut self, valid_batches: &mut V) -> Result<BTreeMap<String, f64>>
    where
        V: FnMut() -> J,
        J: IntoIterator<Item = Batch>,
    {
        self.reset_meters();
        for batch in valid_batches() {
            let output = self.model.eval_step(&batch)?;
            self.measure(&batch, &output)?;
        }
        let mut stats = BTreeMap::new();
        self.collect_stats("val_", &mut stats);
        Ok(stats)
    }

    fn run<B, I, V, J>(&mut self, mut batches: B, mut valid_batches: Option<V>) -> Result<TrainResult>
    where
        B: FnMut() -> I,
        I: IntoIterator<Item = Batch>,
        V: FnMut() -> J,
        J: IntoIterator<Item = Batch>,
    {
        let validating = self.config.validate && valid_batches.is_some();
        let mut names = self.meter_names();
        if validating {
            let val_names: Vec<String> = names.iter().map(|n| format!("val_{n}")).collect();
            names.extend(val_names);
        }

        let steps_at_start = self.global_step;
        let mut stopped_early = false;

        let ctx = self.context(0, BTreeMap::new(), &names);
        if self.callbacks.on_train_begin(&ctx)? == CallbackAction::Stop {
            stopped_early = true;
        }

        'epochs: for _ in 0..self.config.epochs {
            if stopped_early {
                break;
            }
            let ctx = self.context(0, BTreeMap::new(), &names);
            if self.callbacks.on_epoch_begin(&ctx)? == CallbackAction::Stop {
                stopped_early = true;
                break;
            }
            log::info!("epoch {}/{}", self.epochs_trained + 1, self.config.epochs);

            self.reset_meters();
            let mut step = 0;
            for batch in batches() {
                let output = self.model.train_step(&batch)?;
                self.measure(&batch, &output)?;
                step += 1;
                self.global_step += 1;

                let ctx = self.context(step, BTreeMap::new(), &names);
                if self.callbacks.on_step_end(&ctx)? == CallbackAction::Stop {
                    stopped_early = true;
                    break 'epochs;
                }

                if step % self.config.logging_frequency.max(1) == 0 {
                    let mut stats = BTreeMap::new();
                    self.collect_stats("", &mut stats);
                    log::debug!("step {step}: {stats:?}");
                    self.last_stats = stats.clone();
                    let ctx = self.context(step, stats, &names);
                    if self.callbacks.on_log(&ctx)? == CallbackAction::Stop {
                        stopped_early = true;
                        break 'epochs;
                    }
                }
            }

            let mut stats = BTreeMap::new();
            self.collect_stats("", &mut stats);

            if validating {
                if let Some(valid) = valid_batches.as_mut() {
                    let val_stats = self.validate(valid)?;
                    stats.extend(val_stats);
                    let ctx = self.context(step, stats.clone(), &names);
                    if self.callbacks.on_validation_end(&ctx)? == CallbackAction::Stop {
                        stopped_early = true;
                    }
                }
            }

            self.epochs_trained += 1;
            log::info!("epoch {} done: {:?}", self.epochs_trained, stats);
            self.last_stats = stats.clone();
            let ctx = self.context(step, stats, &names);
            if self.callbacks.on_epoch_end(&ctx)? == CallbackAction::Stop {
                stopped_early = true;
            }
        }

        let ctx = self.context(0, self.last_stats.clone(), &names);
        self.callbacks.on_train_end(&ctx)?;

        Ok(TrainResult {
            epochs_trained: self.epochs_trained,
            steps: self.global_step - steps_at_start,
            stopped_early,
            last_stats: self.last_stats.clone(),
        })
    }
}
