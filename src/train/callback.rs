//! Callback system for training events
//!
//! Provides extensible hooks for training loop events:
//! - `on_train_begin` / `on_train_end`
//! - `on_epoch_begin` / `on_epoch_end`
//! - `on_step_end` / `on_log`
//! - `on_validation_end`
//!
//! # Example
//!
//! ```rust
//! use medidor::train::callback::{TrainerCallback, CallbackContext, CallbackAction};
//! use medidor::Result;
//!
//! struct PrintCallback;
//!
//! impl TrainerCallback for PrintCallback {
//!     fn on_epoch_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
//!         println!("Epoch {} finished with loss {:?}", ctx.epoch, ctx.stat("loss"));
//!         Ok(CallbackAction::Continue)
//!     }
//! }
//! ```

use crate::error::Result;
use std::collections::BTreeMap;

/// Context passed to callbacks with current training state
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    /// Epochs completed so far
    pub epoch: usize,
    /// Total epochs planned
    pub max_epochs: usize,
    /// Steps completed within the current epoch
    pub step: usize,
    /// Steps completed since training began
    pub global_step: usize,
    /// Latest meter values, keyed by stat name (`loss`, `acc`, `val_loss`, ...)
    pub stats: BTreeMap<String, f64>,
    /// Every stat name the trainer can report, in registration order
    pub meter_names: Vec<String>,
}

impl CallbackContext {
    /// Look up a stat by name
    pub fn stat(&self, name: &str) -> Option<f64> {
        self.stats.get(name).copied()
    }
}

/// Action to take after a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally
    Continue,
    /// Stop training
    Stop,
}

/// Trait for training callbacks
///
/// Implement this trait to hook into training events. All methods have
/// default no-op implementations, so you only need to implement the
/// events you care about. Errors abort the training run.
pub trait TrainerCallback {
    /// Called before training starts
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Called after training ends, also when stopped early
    fn on_train_end(&mut self, _ctx: &CallbackContext) -> Result<()> {
        Ok(())
    }

    /// Called before each epoch
    fn on_epoch_begin(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Called after each epoch, with training and validation stats
    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Called after each training step
    fn on_step_end(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Called every `logging_frequency` steps with fresh training stats
    fn on_log(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Called after a validation pass
    fn on_validation_end(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Get callback name for logging
    fn name(&self) -> &str {
        "TrainerCallback"
    }
}

// =============================================================================
// Early Stopping Callback
// =============================================================================

/// Stops training when a monitored stat stops improving
///
/// # Example
///
/// ```rust
/// use medidor::train::callback::EarlyStopping;
///
/// // Stop if val_loss has not improved by 0.001 for 5 epochs
/// let early_stop = EarlyStopping::new("val_loss", 5, 0.001);
/// ```
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    /// Stat to monitor
    monitor: String,
    /// Number of epochs to wait for improvement
    patience: usize,
    /// Minimum improvement to reset patience
    min_delta: f64,
    /// Whether larger values are improvements
    higher_is_better: bool,
    best: Option<f64>,
    epochs_without_improvement: usize,
}

impl EarlyStopping {
    /// Create an early stopping callback minimizing `monitor`
    pub fn new(monitor: impl Into<String>, patience: usize, min_delta: f64) -> Self {
        Self {
            monitor: monitor.into(),
            patience,
            min_delta,
            higher_is_better: false,
            best: None,
            epochs_without_improvement: 0,
        }
    }

    /// Treat larger values as improvements (accuracy-like stats)
    pub fn maximize(mut self) -> Self {
        self.higher_is_better = true;
        self
    }

    /// Best value seen so far
    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// Reset internal state
    pub fn reset(&mut self) {
        self.best = None;
        self.epochs_without_improvement = 0;
    }

    fn check_improvement(&mut self, value: f64) -> bool {
        let improved = match self.best {
            None => true,
            Some(best) if self.higher_is_better => value > best + self.min_delta,
            Some(best) => value < best - self.min_delta,
        };
        if improved {
            self.best = Some(value);
            self.epochs_without_improvement = 0;
        } else {
            self.epochs_without_improvement += 1;
        }
        improved
    }
}

impl TrainerCallback for EarlyStopping {
    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        let Some(value) = ctx.stat(&self.monitor) else {
            log::warn!(
                "early stopping: stat '{}' not available at epoch {}",
                self.monitor,
                ctx.epoch
            );
            return Ok(CallbackAction::Continue);
        };
        self.check_improvement(value);

        if self.epochs_without_improvement >= self.patience {
            log::info!(
                "Early stopping: no improvement in '{}' for {} epochs (best: {:.4})",
                self.monitor,
                self.patience,
                self.best.unwrap_or(value)
            );
            Ok(CallbackAction::Stop)
        } else {
            Ok(CallbackAction::Continue)
        }
    }

    fn name(&self) -> &str {
        "EarlyStopping"
    }
}

// =============================================================================
// Progress Logger
// =============================================================================

/// Logs stats through the `log` facade on every log event and epoch end
#[derive(Clone, Debug, Default)]
pub struct ProgressLogger;

impl ProgressLogger {
    pub fn new() -> Self {
        Self
    }

    fn format_stats(ctx: &CallbackContext) -> String {
        ctx.stats
            .iter()
            .map(|(k, v)| format!("{k}: {v:.4}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl TrainerCallback for ProgressLogger {
    fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        log::info!("Epoch {}/{} starting", ctx.epoch + 1, ctx.max_epochs);
        Ok(CallbackAction::Continue)
    }

    fn on_log(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        log::info!(
            "  Step {} (global {}): {}",
            ctx.step,
            ctx.global_step,
            Self::format_stats(ctx)
        );
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        log::info!(
            "Epoch {}/{}: {}",
            ctx.epoch,
            ctx.max_epochs,
            Self::format_stats(ctx)
        );
        Ok(CallbackAction::Continue)
    }

    fn name(&self) -> &str {
        "ProgressLogger"
    }
}

// =============================================================================
// Callback Manager
// =============================================================================

/// Manages multiple callbacks and dispatches events in registration order
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    /// Create new callback manager
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Add a callback
    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    /// Check if no callbacks are registered
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Get number of callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Registered callback names
    pub fn names(&self) -> Vec<&str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    fn dispatch<F>(&mut self, mut event: F) -> Result<CallbackAction>
    where
        F: FnMut(&mut Box<dyn TrainerCallback>) -> Result<CallbackAction>,
    {
        for cb in &mut self.callbacks {
            if event(cb)? == CallbackAction::Stop {
                log::debug!("callback '{}' requested stop", cb.name());
                return Ok(CallbackAction::Stop);
            }
        }
        Ok(CallbackAction::Continue)
    }

    /// Fire train begin event
    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        self.dispatch(|cb| cb.on_train_begin(ctx))
    }

    /// Fire train end event on every callback
    pub fn on_train_end(&mut self, ctx: &CallbackContext) -> Result<()> {
        for cb in &mut self.callbacks {
            cb.on_train_end(ctx)?;
        }
        Ok(())
    }

    /// Fire epoch begin event
    pub fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        self.dispatch(|cb| cb.on_epoch_begin(ctx))
    }

    /// Fire epoch end event
    pub fn on_epoch_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        self.dispatch(|cb| cb.on_epoch_end(ctx))
    }

    /// Fire step end event
    pub fn on_step_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        self.dispatch(|cb| cb.on_step_end(ctx))
    }

    /// Fire log event
    pub fn on_log(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        self.dispatch(|cb| cb.on_log(ctx))
    }

    /// Fire validation end event
    pub fn on_validation_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        self.dispatch(|cb| cb.on_validation_end(ctx))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ctx_with(name: &str, value: f64) -> CallbackContext {
        let mut ctx = CallbackContext::default();
        ctx.stats.insert(name.to_string(), value);
        ctx
    }

    #[test]
    fn test_callback_context_default() {
        let ctx = CallbackContext::default();
        assert_eq!(ctx.epoch, 0);
        assert!(ctx.stats.is_empty());
        assert!(ctx.stat("loss").is_none());
    }

    #[test]
    fn test_early_stopping_patience() {
        let mut es = EarlyStopping::new("loss", 3, 0.001);

        // First epoch - establishes baseline
        assert_eq!(es.on_epoch_end(&ctx_with("loss", 1.0)).unwrap(), CallbackAction::Continue);
        // Improvement
        assert_eq!(es.on_epoch_end(&ctx_with("loss", 0.9)).unwrap(), CallbackAction::Continue);
        // No improvement (within delta)
        assert_eq!(es.on_epoch_end(&ctx_with("loss", 0.8995)).unwrap(), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(&ctx_with("loss", 0.8995)).unwrap(), CallbackAction::Continue);
        // Patience exhausted
        assert_eq!(es.on_epoch_end(&ctx_with("loss", 0.8995)).unwrap(), CallbackAction::Stop);
        assert_eq!(es.best(), Some(0.9));
    }

    #[test]
    fn test_early_stopping_maximize() {
        let mut es = EarlyStopping::new("acc", 1, 0.0).maximize();
        assert_eq!(es.on_epoch_end(&ctx_with("acc", 50.0)).unwrap(), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(&ctx_with("acc", 60.0)).unwrap(), CallbackAction::Continue);
        assert_eq!(es.on_epoch_end(&ctx_with("acc", 55.0)).unwrap(), CallbackAction::Stop);
    }

    #[test]
    fn test_early_stopping_missing_stat_continues() {
        let mut es = EarlyStopping::new("val_loss", 1, 0.0);
        for _ in 0..3 {
            assert_eq!(
                es.on_epoch_end(&ctx_with("loss", 1.0)).unwrap(),
                CallbackAction::Continue
            );
        }
        assert!(es.best().is_none());
    }

    #[test]
    fn test_early_stopping_reset() {
        let mut es = EarlyStopping::new("loss", 1, 0.0);
        es.on_epoch_end(&ctx_with("loss", 1.0)).unwrap();
        es.reset();
        assert!(es.best().is_none());
        assert_eq!(es.epochs_without_improvement, 0);
    }

    #[test]
    fn test_progress_logger_never_stops() {
        let mut progress = ProgressLogger::new();
        let ctx = CallbackContext {
            epoch: 1,
            max_epochs: 10,
            step: 5,
            ..ctx_with("loss", 0.5)
        };

        assert_eq!(progress.on_epoch_begin(&ctx).unwrap(), CallbackAction::Continue);
        assert_eq!(progress.on_log(&ctx).unwrap(), CallbackAction::Continue);
        assert_eq!(progress.on_epoch_end(&ctx).unwrap(), CallbackAction::Continue);
    }

    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
        tag: &'static str,
        stop_on_log: bool,
    }

    impl TrainerCallback for Recorder {
        fn on_log(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
            self.events.borrow_mut().push(format!("{}:log", self.tag));
            Ok(if self.stop_on_log {
                CallbackAction::Stop
            } else {
                CallbackAction::Continue
            })
        }

        fn on_train_end(&mut self, _ctx: &CallbackContext) -> Result<()> {
            self.events.borrow_mut().push(format!("{}:end", self.tag));
            Ok(())
        }
    }

    struct Failing;

    impl TrainerCallback for Failing {
        fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
            Err(Error::Config("boom".into()))
        }
    }

    #[test]
    fn test_manager_dispatch_order_and_stop() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut manager = CallbackManager::new();
        manager.add(Recorder {
            events: events.clone(),
            tag: "a",
            stop_on_log: true,
        });
        manager.add(Recorder {
            events: events.clone(),
            tag: "b",
            stop_on_log: false,
        });

        let ctx = CallbackContext::default();
        assert_eq!(manager.on_log(&ctx).unwrap(), CallbackAction::Stop);
        manager.on_train_end(&ctx).unwrap();

        assert_eq!(*events.borrow(), vec!["a:log", "a:end", "b:end"]);
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.names(), vec!["TrainerCallback", "TrainerCallback"]);
    }

    #[test]
    fn test_manager_propagates_errors() {
        let mut manager = CallbackManager::new();
        manager.add(Failing);
        assert!(manager.on_epoch_end(&CallbackContext::default()).is_err());
    }

    #[test]
    fn test_manager_early_stopping() {
        let mut manager = CallbackManager::new();
        manager.add(EarlyStopping::new("loss", 1, 0.001));

        let ctx = ctx_with("loss", 1.0);
        assert_eq!(manager.on_epoch_end(&ctx).unwrap(), CallbackAction::Continue);
        assert_eq!(manager.on_epoch_end(&ctx).unwrap(), CallbackAction::Stop);
    }
}

// =============================================================================
// Property Tests
// =============================================================================
