use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint};

use crate::adapters::csv_source::CsvOptions;
use crate::adapters::render::OutputFormat;
use crate::app::AppError;
use crate::domain::integration::IntervalPolicy;
use crate::domain::power_mode::{PowerMode, PowerSelection};

const DEFAULT_DELIMITER: u8 = b',';
const DEFAULT_TIME_COLUMN: &str = "timestamp";

/// Estimate energy consumption from CSV power logs.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// CSV files, or directories whose *.csv files are read
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,

    /// Field delimiter: one ASCII character or `tab` [env: ENERGY_DELIMITER] [default: ,]
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Timestamp column [env: ENERGY_TIME_COLUMN] [default: timestamp]
    #[arg(long)]
    pub time_column: Option<String>,

    /// strftime pattern for timestamps, e.g. '%d/%m/%Y %H:%M:%S'; ISO 8601 when omitted [env: ENERGY_TIME_FORMAT]
    #[arg(long)]
    pub time_format: Option<String>,

    /// Column holding power in watts [default: power]
    #[arg(long)]
    pub power_column: Option<String>,

    /// Factor applied to the power column
    #[arg(long, allow_negative_numbers = true)]
    pub power_scale: Option<f64>,

    /// Column holding voltage in volts (requires --current-column)
    #[arg(long)]
    pub voltage_column: Option<String>,

    /// Column holding current in amperes (requires --voltage-column)
    #[arg(long)]
    pub current_column: Option<String>,

    /// Column holding a 0-100 percentage of the rated power
    #[arg(long)]
    pub percentage_column: Option<String>,

    /// Rated power in watts for percentage mode [env: ENERGY_RATED_POWER_W]
    #[arg(long)]
    pub rated_power_w: Option<f64>,

    /// Fail a file when timestamps go backwards instead of skipping the interval; `--strict-order=false` turns it off [env: ENERGY_STRICT_ORDER]
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub strict_order: Option<bool>,

    /// Report format [env: ENERGY_OUTPUT] [default: text]
    #[arg(long, value_enum)]
    pub output: Option<OutputFormat>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub paths: Vec<PathBuf>,
    pub csv: CsvOptions,
    pub interval_policy: IntervalPolicy,
    pub output: OutputFormat,
}

impl AppConfig {
    pub fn from_args(args: CliArgs) -> Result<Self, AppError> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(args: CliArgs, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let delimiter = match args.delimiter.or_else(|| lookup("ENERGY_DELIMITER")) {
            Some(raw) => parse_delimiter(&raw)?,
            None => DEFAULT_DELIMITER,
        };

        let time_column = non_empty(args.time_column)
            .or_else(|| non_empty(lookup("ENERGY_TIME_COLUMN")))
            .unwrap_or_else(|| DEFAULT_TIME_COLUMN.to_string());

        let time_format =
            non_empty(args.time_format).or_else(|| non_empty(lookup("ENERGY_TIME_FORMAT")));

        let rated_power_w = match args.rated_power_w {
            Some(value) => Some(value),
            None => parse_optional::<f64, _>(&lookup, "ENERGY_RATED_POWER_W")?,
        };

        let mode = PowerMode::from_selection(&PowerSelection {
            power_column: args.power_column,
            power_scale: args.power_scale,
            voltage_column: args.voltage_column,
            current_column: args.current_column,
            percentage_column: args.percentage_column,
            rated_power_w,
        })
        .map_err(AppError::config)?;

        let strict_order = match args.strict_order {
            Some(strict_order) => strict_order,
            None => parse_flag(&lookup, "ENERGY_STRICT_ORDER")?,
        };

        let output = match args.output {
            Some(output) => output,
            None => match non_empty(lookup("ENERGY_OUTPUT")) {
                Some(raw) => <OutputFormat as ValueEnum>::from_str(&raw, true).map_err(|_| {
                    AppError::config(format!("ENERGY_OUTPUT must be text or json, got '{raw}'"))
                })?,
                None => OutputFormat::default(),
            },
        };

        Ok(Self {
            paths: args.paths,
            csv: CsvOptions {
                delimiter,
                time_column,
                time_format,
                mode,
            },
            interval_policy: if strict_order {
                IntervalPolicy::Strict
            } else {
                IntervalPolicy::SkipNonPositive
            },
            output,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_delimiter(raw: &str) -> Result<u8, AppError> {
    if matches!(raw, "\t" | "\\t" | "tab") {
        return Ok(b'\t');
    }

    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(char), None) if char.is_ascii() => Ok(char as u8),
        _ => Err(AppError::config(format!(
            "delimiter must be a single ASCII character, got '{raw}'"
        ))),
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(None),
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)).map(|v| v.to_ascii_lowercase()) {
        None => Ok(false),
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::config(format!("{key} must be true or false"))),
        },
    }
}
