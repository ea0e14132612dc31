//! CSV export of training stats
//!
//! Writes one row per log event and per epoch end. Missing stats become empty
//! cells, so rows logged mid-epoch simply leave validation columns blank.

use super::callback::{CallbackAction, CallbackContext, TrainerCallback};
use super::config::CsvExportConfig;
use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

/// Callback exporting stats to a CSV file
#[derive(Debug)]
pub struct CsvExporter {
    output: PathBuf,
    append: bool,
    columns: Option<Vec<String>>,
    writer: Option<csv::Writer<File>>,
}

impl CsvExporter {
    /// Export to `output`, truncating any existing file
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            append: false,
            columns: None,
            writer: None,
        }
    }

    pub fn from_config(config: &CsvExportConfig) -> Self {
        Self {
            output: config.output.clone(),
            append: config.append,
            columns: config.columns.clone(),
            writer: None,
        }
    }

    /// Append rows to an existing file instead of truncating it
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Export only these columns
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Resolved columns, available once training has begun
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    fn write_row(&mut self, ctx: &CallbackContext) -> Result<()> {
        let (Some(writer), Some(columns)) = (self.writer.as_mut(), self.columns.as_ref()) else {
            return Ok(());
        };
        let row = columns.iter().map(|column| match column.as_str() {
            "epoch" => ctx.epoch.to_string(),
            "step" => ctx.step.to_string(),
            name => ctx.stat(name).map(|v| v.to_string()).unwrap_or_default(),
        });
        writer.write_record(row)?;
        writer.flush()?;
        Ok(())
    }
}

impl TrainerCallback for CsvExporter {
    fn on_train_begin(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        let columns = self.columns.get_or_insert_with(|| {
            ["epoch".to_string(), "step".to_string()]
                .into_iter()
                .chain(ctx.meter_names.iter().cloned())
                .collect()
        });

        let appending = self.append && self.output.is_file();
        let file = if appending {
            OpenOptions::new().append(true).open(&self.output)?
        } else {
            File::create(&self.output)?
        };
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !appending {
            writer.write_record(columns.iter())?;
            writer.flush()?;
        }
        log::debug!(
            "exporting {} columns to {}",
            columns.len(),
            self.output.display()
        );
        self.writer = Some(writer);
        Ok(CallbackAction::Continue)
    }

    fn on_log(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        self.write_row(ctx)?;
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        self.write_row(ctx)?;
        Ok(CallbackAction::Continue)
    }

    fn on_train_end(&mut self, _ctx: &CallbackContext) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "CsvExporter"
    }
}
