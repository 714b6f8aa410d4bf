use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::adapters::csv_source::{LoadError, load_samples_from_path};
use crate::adapters::discovery::resolve_inputs;
use crate::adapters::render::render_batch;
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::domain::integration::IntegrationError;
use crate::domain::report::{BatchOutcome, FileFailure, Report};

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to load samples: {0}")]
    Load(#[source] LoadError),
    #[error("failed to integrate energy: {0}")]
    Integrate(#[source] IntegrationError),
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let outcome = process_batch(&config);

    let rendered = render_batch(&outcome, config.output).map_err(AppError::output)?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(AppError::output)?;

    if outcome.reports.is_empty() {
        return Err(AppError::NoReports);
    }

    Ok(())
}

/// Processes every resolved input independently. A file that fails is
/// recorded and the batch moves on.
pub fn process_batch(config: &AppConfig) -> BatchOutcome {
    let inputs = resolve_inputs(&config.paths);
    let mut outcome = BatchOutcome::default();

    for failure in inputs.failures {
        tracing::warn!(path = %failure.path().display(), error = %failure, "input skipped");
        outcome
            .failures
            .push(FileFailure::new(failure.path(), &failure));
    }

    for path in inputs.files {
        match process_file(&path, config) {
            Ok(report) => {
                tracing::info!(
                    path = %path.display(),
                    samples = report.sample_count(),
                    skipped_rows = report.skipped_rows(),
                    energy_wh = report.energy_wh(),
                    "energy estimated"
                );
                outcome.reports.push(report);
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "file skipped");
                outcome.failures.push(FileFailure::new(path, error));
            }
        }
    }

    if let Some(summary) = outcome.summary() {
        tracing::info!(
            reports = summary.report_count,
            samples = summary.sample_count,
            energy_wh = summary.energy_wh,
            "batch consolidated"
        );
    }

    outcome
}

pub fn process_file(path: &Path, config: &AppConfig) -> Result<Report, FileError> {
    let loaded = load_samples_from_path(path, &config.csv).map_err(FileError::Load)?;
    Report::build(path, &config.csv.mode, loaded, config.interval_policy)
        .map_err(FileError::Integrate)
}
