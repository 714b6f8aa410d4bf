use std::fmt::{self, Write};

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

use crate::domain::report::{BatchOutcome, ConsolidatedSummary, FileFailure, Report};

const NOT_ENOUGH_SAMPLES: &str = "at least two samples are required to estimate consumption";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to format report: {0}")]
    Format(#[from] fmt::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, PartialEq)]
struct ReportView {
    source: String,
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    counterfactual: Option<&'static str>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    duration_hours: Option<f64>,
    sample_count: usize,
    skipped_rows: usize,
    energy_wh: f64,
    energy_kwh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy_without_control_wh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    savings_wh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    savings_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'static str>,
}

#[derive(Debug, Serialize, PartialEq)]
struct SummaryView {
    report_count: usize,
    sample_count: usize,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    duration_hours: Option<f64>,
    energy_wh: f64,
    energy_kwh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy_without_control_wh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    savings_wh: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
struct FailureView {
    path: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct BatchView {
    reports: Vec<ReportView>,
    failures: Vec<FailureView>,
    summary: Option<SummaryView>,
}

impl From<&Report> for ReportView {
    fn from(report: &Report) -> Self {
        Self {
            source: report.source().display().to_string(),
            mode: report.mode(),
            counterfactual: report.counterfactual(),
            start: report.start(),
            end: report.end(),
            duration_hours: report.duration_hours(),
            sample_count: report.sample_count(),
            skipped_rows: report.skipped_rows(),
            energy_wh: report.energy_wh(),
            energy_kwh: report.energy_kwh(),
            energy_without_control_wh: report.energy_without_control_wh(),
            savings_wh: report.savings_wh(),
            savings_ratio: report.savings_ratio(),
            notice: (!report.has_enough_samples()).then_some(NOT_ENOUGH_SAMPLES),
        }
    }
}

impl From<&ConsolidatedSummary> for SummaryView {
    fn from(summary: &ConsolidatedSummary) -> Self {
        Self {
            report_count: summary.report_count,
            sample_count: summary.sample_count,
            start: summary.start,
            end: summary.end,
            duration_hours: summary.duration_hours(),
            energy_wh: summary.energy_wh,
            energy_kwh: summary.energy_kwh(),
            energy_without_control_wh: summary.energy_without_control_wh,
            savings_wh: summary.savings_wh(),
        }
    }
}

impl From<&FileFailure> for FailureView {
    fn from(failure: &FileFailure) -> Self {
        Self {
            path: failure.path.display().to_string(),
            reason: failure.reason.clone(),
        }
    }
}

pub fn render_batch(outcome: &BatchOutcome, format: OutputFormat) -> Result<String, RenderError> {
    match format {
        OutputFormat::Text => render_batch_text(outcome),
        OutputFormat::Json => {
            let view = BatchView {
                reports: outcome.reports.iter().map(ReportView::from).collect(),
                failures: outcome.failures.iter().map(FailureView::from).collect(),
                summary: outcome.summary().as_ref().map(SummaryView::from),
            };
            let mut json = serde_json::to_string_pretty(&view)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn render_batch_text(outcome: &BatchOutcome) -> Result<String, RenderError> {
    let mut out = String::new();

    for (index, report) in outcome.reports.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        write_report(&mut out, report)?;
    }

    if let Some(summary) = outcome.summary() {
        writeln!(out)?;
        write_summary(&mut out, &summary)?;
    }

    if !outcome.failures.is_empty() {
        if !out.is_empty() {
            writeln!(out)?;
        }
        for failure in &outcome.failures {
            writeln!(out, "Skipped {}: {}", failure.path.display(), failure.reason)?;
        }
    }

    Ok(out)
}

fn write_report(out: &mut String, report: &Report) -> fmt::Result {
    writeln!(out, "Report: {}", report.source().display())?;
    writeln!(out, "  Mode: {}", report.mode())?;
    if let Some(counterfactual) = report.counterfactual() {
        writeln!(out, "  Without-control model: {counterfactual}")?;
    }
    writeln!(out, "  Start: {}", format_timestamp(report.start()))?;
    writeln!(out, "  End: {}", format_timestamp(report.end()))?;
    writeln!(out, "  Duration: {}", format_hours(report.duration_hours()))?;
    writeln!(out, "  Samples: {}", report.sample_count())?;
    writeln!(out, "  Skipped rows: {}", report.skipped_rows())?;
    writeln!(out)?;

    if !report.has_enough_samples() {
        writeln!(out, "  Note: {NOT_ENOUGH_SAMPLES}.")?;
        return Ok(());
    }

    write_energy(
        out,
        report.energy_wh(),
        report.energy_without_control_wh(),
        report.savings_ratio(),
    )
}

fn write_summary(out: &mut String, summary: &ConsolidatedSummary) -> fmt::Result {
    writeln!(out, "Consolidated summary ({} files):", summary.report_count)?;
    writeln!(out, "  Start: {}", format_timestamp(summary.start))?;
    writeln!(out, "  End: {}", format_timestamp(summary.end))?;
    writeln!(out, "  Duration: {}", format_hours(summary.duration_hours()))?;
    writeln!(out, "  Samples: {}", summary.sample_count)?;
    writeln!(out)?;

    let savings_ratio = summary
        .energy_without_control_wh
        .filter(|without_control| *without_control > 0.0)
        .zip(summary.savings_wh())
        .map(|(without_control, savings)| savings / without_control);

    write_energy(
        out,
        summary.energy_wh,
        summary.energy_without_control_wh,
        savings_ratio,
    )
}

fn write_energy(
    out: &mut String,
    energy_wh: f64,
    energy_without_control_wh: Option<f64>,
    savings_ratio: Option<f64>,
) -> fmt::Result {
    writeln!(out, "Estimated consumption:")?;

    let Some(without_control_wh) = energy_without_control_wh else {
        writeln!(out, "  {energy_wh:.2} Wh")?;
        return writeln!(out, "  {:.4} kWh", energy_wh / 1000.0);
    };

    writeln!(
        out,
        "  With control: {energy_wh:.2} Wh ({:.4} kWh)",
        energy_wh / 1000.0
    )?;
    writeln!(
        out,
        "  Without control: {without_control_wh:.2} Wh ({:.4} kWh)",
        without_control_wh / 1000.0
    )?;

    let savings_wh = without_control_wh - energy_wh;
    match savings_ratio {
        Some(ratio) => writeln!(out, "  Savings: {savings_wh:.2} Wh ({:.1}%)", ratio * 100.0),
        None => writeln!(out, "  Savings: {savings_wh:.2} Wh"),
    }
}

fn format_timestamp(timestamp: Option<NaiveDateTime>) -> String {
    timestamp
        .map(|timestamp| timestamp.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_hours(hours: Option<f64>) -> String {
    hours
        .map(|hours| format!("{hours:.2} h"))
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use serde_json::Value;

    use super::{OutputFormat, render_batch};
    use crate::domain::integration::IntervalPolicy;
    use crate::domain::power_mode::PowerMode;
    use crate::domain::report::{BatchOutcome, FileFailure, Report};
    use crate::domain::sample::{LoadedSamples, Sample};

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid base timestamp")
    }

    fn report(name: &str, mode: &PowerMode, readings: &[f64]) -> Report {
        let samples = readings
            .iter()
            .enumerate()
            .map(|(hour, value)| {
                let reading = mode.derive_power(&[*value]).expect("reading");
                Sample {
                    timestamp: base() + Duration::hours(hour as i64),
                    power_w: reading.power_w,
                    power_without_control_w: reading.power_without_control_w,
                }
            })
            .collect();
        Report::build(
            name,
            mode,
            LoadedSamples {
                samples,
                skipped_rows: 0,
            },
            IntervalPolicy::default(),
        )
        .expect("report")
    }

    #[test]
    fn renders_direct_power_report_as_text() {
        let outcome = BatchOutcome {
            reports: vec![report("a.csv", &PowerMode::direct("power"), &[20.0, 20.0])],
            failures: Vec::new(),
        };

        let text = render_batch(&outcome, OutputFormat::Text).expect("render");

        assert_eq!(
            text,
            "Report: a.csv\n\
             \x20 Mode: power\n\
             \x20 Start: 2024-01-01 00:00:00\n\
             \x20 End: 2024-01-01 01:00:00\n\
             \x20 Duration: 1.00 h\n\
             \x20 Samples: 2\n\
             \x20 Skipped rows: 0\n\
             \n\
             Estimated consumption:\n\
             \x20 20.00 Wh\n\
             \x20 0.0200 kWh\n"
        );
    }

    #[test]
    fn renders_percentage_scenarios() {
        let outcome = BatchOutcome {
            reports: vec![report(
                "lamp.csv",
                &PowerMode::percentage("dim", 60.0),
                &[0.0, 50.0, 0.0],
            )],
            failures: Vec::new(),
        };

        let text = render_batch(&outcome, OutputFormat::Text).expect("render");

        assert!(text.contains("  Without-control model: full-power-when-active\n"));
        assert!(text.contains("  With control: 30.00 Wh (0.0300 kWh)\n"));
        assert!(text.contains("  Without control: 60.00 Wh (0.0600 kWh)\n"));
        assert!(text.contains("  Savings: 30.00 Wh (50.0%)\n"));
    }

    #[test]
    fn renders_notice_for_single_sample() {
        let outcome = BatchOutcome {
            reports: vec![report("one.csv", &PowerMode::direct("power"), &[5.0])],
            failures: Vec::new(),
        };

        let text = render_batch(&outcome, OutputFormat::Text).expect("render");

        assert!(text.contains("  Duration: -\n"));
        assert!(text.contains("at least two samples are required"));
        assert!(!text.contains("Estimated consumption"));
    }

    #[test]
    fn renders_summary_and_failures_for_batches() {
        let mode = PowerMode::direct("power");
        let outcome = BatchOutcome {
            reports: vec![
                report("a.csv", &mode, &[10.0, 10.0]),
                report("b.csv", &mode, &[30.0, 30.0, 30.0]),
            ],
            failures: vec![FileFailure::new("c.csv", "missing columns in CSV: power")],
        };

        let text = render_batch(&outcome, OutputFormat::Text).expect("render");

        assert!(text.contains("Consolidated summary (2 files):\n"));
        assert!(text.contains("  Samples: 5\n"));
        assert!(text.contains("  70.00 Wh\n"));
        assert!(text.ends_with("Skipped c.csv: missing columns in CSV: power\n"));
    }

    #[test]
    fn renders_json_batch() {
        let mode = PowerMode::percentage("dim", 60.0);
        let outcome = BatchOutcome {
            reports: vec![
                report("a.csv", &mode, &[0.0, 50.0, 0.0]),
                report("b.csv", &mode, &[100.0, 100.0]),
            ],
            failures: vec![FileFailure::new("c.csv", "path not found: c.csv")],
        };

        let json = render_batch(&outcome, OutputFormat::Json).expect("render");
        let value: Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["reports"][0]["source"], "a.csv");
        assert_eq!(value["reports"][0]["mode"], "percentage");
        assert_eq!(value["reports"][0]["counterfactual"], "full-power-when-active");
        assert_eq!(value["reports"][0]["start"], "2024-01-01T00:00:00");
        assert_eq!(value["reports"][0]["energy_wh"], 30.0);
        assert_eq!(value["reports"][0]["energy_without_control_wh"], 60.0);
        assert_eq!(value["reports"][1]["energy_wh"], 60.0);
        assert_eq!(value["summary"]["energy_wh"], 90.0);
        assert_eq!(value["summary"]["energy_without_control_wh"], 120.0);
        assert_eq!(value["summary"]["sample_count"], 5);
        assert_eq!(value["failures"][0]["path"], "c.csv");
    }

    #[test]
    fn json_omits_counterfactual_fields_for_direct_power() {
        let outcome = BatchOutcome {
            reports: vec![report("a.csv", &PowerMode::direct("power"), &[1.0, 1.0])],
            failures: Vec::new(),
        };

        let json = render_batch(&outcome, OutputFormat::Json).expect("render");
        let value: Value = serde_json::from_str(&json).expect("valid json");

        assert!(value["reports"][0].get("energy_without_control_wh").is_none());
        assert!(value["reports"][0].get("counterfactual").is_none());
        assert!(value["summary"].is_null());
    }
}
