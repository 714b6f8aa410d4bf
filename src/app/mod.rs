mod config;
mod error;
mod logging;
mod runtime;

use clap::Parser;

pub use config::{AppConfig, CliArgs};
pub use error::AppError;
pub use runtime::{FileError, process_batch, process_file};

pub fn run() -> Result<(), AppError> {
    if let Err(error) = dotenvy::dotenv()
        && !error.not_found()
    {
        return Err(AppError::config(error));
    }

    logging::init()?;

    let config = AppConfig::from_args(CliArgs::parse())?;

    tracing::info!(
        inputs = config.paths.len(),
        delimiter = %char::from(config.csv.delimiter).escape_default(),
        time_column = %config.csv.time_column,
        time_format = config.csv.time_format.as_deref().unwrap_or("iso8601"),
        mode = config.csv.mode.label(),
        interval_policy = ?config.interval_policy,
        "energy report bootstrap initialized"
    );

    runtime::run(config)
}
