use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::domain::integration::{
    EnergyTotals, IntegrationError, IntervalPolicy, delta_hours, integrate,
};
use crate::domain::power_mode::PowerMode;
use crate::domain::sample::{LoadedSamples, Sample};

/// Energy estimate for one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    source: PathBuf,
    mode: &'static str,
    counterfactual: Option<&'static str>,
    samples: Vec<Sample>,
    skipped_rows: usize,
    totals: EnergyTotals,
}

impl Report {
    pub fn build(
        source: impl Into<PathBuf>,
        mode: &PowerMode,
        loaded: LoadedSamples,
        policy: IntervalPolicy,
    ) -> Result<Self, IntegrationError> {
        let totals = integrate(&loaded.samples, mode, policy)?;

        Ok(Self {
            source: source.into(),
            mode: mode.label(),
            counterfactual: mode.counterfactual_name(),
            samples: loaded.samples,
            skipped_rows: loaded.skipped_rows,
            totals,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn mode(&self) -> &'static str {
        self.mode
    }

    /// Without-control model used for the second total, if any.
    pub fn counterfactual(&self) -> Option<&'static str> {
        self.counterfactual
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn has_enough_samples(&self) -> bool {
        self.samples.len() >= 2
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.samples.first().map(|sample| sample.timestamp)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|sample| sample.timestamp)
    }

    pub fn duration_hours(&self) -> Option<f64> {
        if !self.has_enough_samples() {
            return None;
        }
        Some(delta_hours(self.start()?, self.end()?))
    }

    pub fn energy_wh(&self) -> f64 {
        self.totals.energy_wh
    }

    pub fn energy_kwh(&self) -> f64 {
        self.totals.energy_wh / 1000.0
    }

    pub fn energy_without_control_wh(&self) -> Option<f64> {
        self.totals.energy_without_control_wh
    }

    pub fn savings_wh(&self) -> Option<f64> {
        self.energy_without_control_wh()
            .map(|without_control| without_control - self.energy_wh())
    }

    /// Share of the uncontrolled energy that control avoided.
    pub fn savings_ratio(&self) -> Option<f64> {
        let without_control = self.energy_without_control_wh()?;
        if without_control <= 0.0 {
            return None;
        }
        self.savings_wh().map(|savings| savings / without_control)
    }
}

/// Additive fold over several reports. No alignment across files.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedSummary {
    pub report_count: usize,
    pub energy_wh: f64,
    pub energy_without_control_wh: Option<f64>,
    pub sample_count: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl ConsolidatedSummary {
    /// Returns `None` unless at least two reports are given.
    pub fn from_reports(reports: &[Report]) -> Option<Self> {
        if reports.len() < 2 {
            return None;
        }

        let energy_without_control_wh = reports
            .iter()
            .map(Report::energy_without_control_wh)
            .sum::<Option<f64>>();

        Some(Self {
            report_count: reports.len(),
            energy_wh: reports.iter().map(Report::energy_wh).sum(),
            energy_without_control_wh,
            sample_count: reports.iter().map(Report::sample_count).sum(),
            start: reports.iter().filter_map(Report::start).min(),
            end: reports.iter().filter_map(Report::end).max(),
        })
    }

    pub fn energy_kwh(&self) -> f64 {
        self.energy_wh / 1000.0
    }

    pub fn duration_hours(&self) -> Option<f64> {
        if self.sample_count < 2 {
            return None;
        }
        Some(delta_hours(self.start?, self.end?))
    }

    pub fn savings_wh(&self) -> Option<f64> {
        self.energy_without_control_wh
            .map(|without_control| without_control - self.energy_wh)
    }
}

/// An input that produced no report, with the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl FileFailure {
    pub fn new<E: std::fmt::Display>(path: impl Into<PathBuf>, error: E) -> Self {
        Self {
            path: path.into(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub reports: Vec<Report>,
    pub failures: Vec<FileFailure>,
}

impl BatchOutcome {
    pub fn summary(&self) -> Option<ConsolidatedSummary> {
        ConsolidatedSummary::from_reports(&self.reports)
    }
}
