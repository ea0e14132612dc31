//! Error types for Medidor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No measurements have been made since the last reset")]
    ZeroMeasurements,

    #[error("Expected number of classes to be greater than zero or \"auto\". Got {nr_classes}")]
    InvalidNrOfClasses { nr_classes: String },

    #[error("Expected input tensors of an integer type. Got {dtype}")]
    InvalidInputType { dtype: &'static str },

    #[error("Expected input tensors of 1-dimension. Got {dims}")]
    InvalidBatchDimension { dims: usize },

    #[error("Expected input and targets of same lengths. Got {predictions} and {targets}")]
    InvalidLengths { predictions: usize, targets: usize },

    #[error("Expected labels between 0 and number of classes ({nr_classes}). Got {label}")]
    InvalidLabels { label: i64, nr_classes: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
