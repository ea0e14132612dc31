//! Medidor CLI
//!
//! # Usage
//!
//! ```bash
//! # Confusion matrix of a prediction,target CSV
//! medidor confusion predictions.csv
//!
//! # Fixed class count, column-normalized
//! medidor confusion predictions.csv --classes 10 --normalize
//! ```

use clap::Parser;
use medidor::cli::{run_confusion, Cli, Command};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match &cli.command {
        Command::Confusion(args) => run_confusion(args).map(|report| println!("{report}")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
