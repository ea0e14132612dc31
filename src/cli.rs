//! CLI argument parsing and commands
//!
//! # Usage
//!
//! ```bash
//! medidor confusion predictions.csv
//! medidor confusion predictions.csv --classes 10 --normalize
//! medidor confusion predictions.csv --no-header --batch-size 1024
//! ```

use crate::error::{Error, Result};
use crate::meters::{
    percentage, Average, BatchMeter, CategoricalAccuracy, ConfusionMatrix, Meter, NrClasses,
    Percentage,
};
use crate::Tensor;
use clap::{Parser, Subcommand};
use ndarray::Array2;
use std::fmt;
use std::path::{Path, PathBuf};

/// Medidor: running metrics for supervised training
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "medidor")]
#[command(version)]
#[command(about = "Running metrics for supervised training")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Confusion matrix and accuracy of a `prediction,target` CSV file
    Confusion(ConfusionArgs),
}

/// Arguments for the confusion command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ConfusionArgs {
    /// CSV file with one `prediction,target` pair per row
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Number of classes, or `auto` to discover them from the labels
    #[arg(short, long, default_value = "auto")]
    pub classes: NrClasses,

    /// Normalize every column of the matrix
    #[arg(short, long)]
    pub normalize: bool,

    /// The first row holds data, not column names
    #[arg(long)]
    pub no_header: bool,

    /// Rows fed to the meters at once
    #[arg(short, long, default_value_t = 256)]
    pub batch_size: usize,
}

/// Result of the confusion command
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionReport {
    /// Matrix indexed `[target][prediction]`
    pub matrix: Array2<f64>,
    /// Whether the matrix is column-normalized
    pub normalized: bool,
    /// Categorical accuracy in percent, `None` for an empty input
    pub accuracy: Option<f64>,
    /// Rows read
    pub samples: usize,
}

impl fmt::Display for ConfusionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = |v: f64| {
            if self.normalized {
                format!("{v:.3}")
            } else {
                format!("{v}")
            }
        };
        let width = self
            .matrix
            .iter()
            .map(|&v| cell(v).len())
            .chain([self.matrix.ncols().to_string().len(), 3])
            .max()
            .unwrap_or(3);

        write!(f, "{:>width$}", "t\\p")?;
        for p in 0..self.matrix.ncols() {
            write!(f, " {p:>width$}")?;
        }
        writeln!(f)?;
        for (t, row) in self.matrix.rows().into_iter().enumerate() {
            write!(f, "{t:>width$}")?;
            for &v in row {
                write!(f, " {:>width$}", cell(v))?;
            }
            writeln!(f)?;
        }

        writeln!(f, "samples: {}", self.samples)?;
        match self.accuracy {
            Some(acc) => write!(f, "accuracy: {acc:.2}%"),
            None => write!(f, "accuracy: n/a"),
        }
    }
}

/// Read `(prediction, target)` rows from a CSV file
pub fn read_pairs(path: &Path, has_header: bool) -> Result<Vec<(i64, i64)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut pairs = Vec::new();
    for record in reader.deserialize() {
        pairs.push(record?);
    }
    Ok(pairs)
}

/// Feed labelled pairs through a confusion matrix and an accuracy meter
pub fn confusion_report(pairs: &[(i64, i64)], args: &ConfusionArgs) -> Result<ConfusionReport> {
    let mut matrix = ConfusionMatrix::new(args.classes, args.normalize)?;
    let mut accuracy: BatchMeter<CategoricalAccuracy, Percentage<Average>> =
        BatchMeter::with_aggregator(CategoricalAccuracy, percentage(Average));
    matrix.reset();
    accuracy.reset();

    for chunk in pairs.chunks(args.batch_size.max(1)) {
        let (predicted, targets): (Vec<i64>, Vec<i64>) = chunk.iter().copied().unzip();
        let predicted = Tensor::from_indices(predicted);
        let targets = Tensor::from_indices(targets);
        matrix.measure(&predicted, &targets)?;
        accuracy.measure(&predicted, &targets)?;
    }
    log::debug!(
        "measured {} rows into a {}-class matrix",
        pairs.len(),
        matrix.nr_classes()
    );

    let accuracy = match accuracy.value() {
        Ok(v) => Some(v),
        Err(Error::ZeroMeasurements) => None,
        Err(e) => return Err(e),
    };
    Ok(ConfusionReport {
        matrix: matrix.value()?,
        normalized: args.normalize,
        accuracy,
        samples: pairs.len(),
    })
}

/// Run the confusion command on a file
pub fn run_confusion(args: &ConfusionArgs) -> Result<ConfusionReport> {
    log::info!("reading {}", args.input.display());
    let pairs = read_pairs(&args.input, !args.no_header)?;
    confusion_report(&pairs, args)
}
