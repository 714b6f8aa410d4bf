use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use crate::domain::power_mode::{PowerMode, PowerModeError};
use crate::domain::sample::{LoadedSamples, Sample};
use crate::domain::values::{parse_number, parse_timestamp};

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read CSV header: {0}")]
    Header(#[source] csv::Error),
    #[error("missing columns in CSV: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("invalid power configuration: {0}")]
    PowerMode(#[from] PowerModeError),
}

#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub time_column: String,
    pub time_format: Option<String>,
    pub mode: PowerMode,
}

impl CsvOptions {
    pub fn new(mode: PowerMode) -> Self {
        Self {
            delimiter: b',',
            time_column: "timestamp".to_string(),
            time_format: None,
            mode,
        }
    }
}

#[derive(Debug)]
struct ColumnIndexes {
    time: usize,
    mode: Vec<usize>,
}

pub fn load_samples_from_path(
    path: &Path,
    options: &CsvOptions,
) -> Result<LoadedSamples, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_samples(file, options)
}

/// Reads every data row, keeping those with a valid timestamp and power, and
/// returns them sorted by timestamp. Equal timestamps keep file order.
pub fn load_samples<R: Read>(
    reader: R,
    options: &CsvOptions,
) -> Result<LoadedSamples, LoadError> {
    options.mode.validate()?;

    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().map_err(LoadError::Header)?.clone();
    let columns = resolve_columns(&headers, options)?;
    let time_format = options.time_format.as_deref();

    let mut loaded = LoadedSamples::default();
    for (row, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                tracing::debug!(row = row + 1, error = %error, "skipping unreadable row");
                loaded.skipped_rows += 1;
                continue;
            }
        };

        match parse_row(&record, &columns, time_format, &options.mode) {
            Some(sample) => loaded.samples.push(sample),
            None => {
                tracing::debug!(row = row + 1, "skipping row with missing or invalid values");
                loaded.skipped_rows += 1;
            }
        }
    }

    loaded.samples.sort_by_key(|sample| sample.timestamp);

    tracing::debug!(
        samples = loaded.samples.len(),
        skipped_rows = loaded.skipped_rows,
        mode = options.mode.label(),
        "csv samples loaded"
    );

    Ok(loaded)
}

fn resolve_columns(
    headers: &StringRecord,
    options: &CsvOptions,
) -> Result<ColumnIndexes, LoadError> {
    let names: Vec<&str> = headers
        .iter()
        .map(|name| name.trim_start_matches(UTF8_BOM).trim())
        .collect();
    let position = |wanted: &str| names.iter().position(|name| *name == wanted.trim());

    let mut missing = BTreeSet::new();
    let time = position(options.time_column.as_str());
    if time.is_none() {
        missing.insert(options.time_column.clone());
    }

    let mut mode = Vec::new();
    for column in options.mode.required_columns() {
        match position(column) {
            Some(index) => mode.push(index),
            None => {
                missing.insert(column.to_string());
            }
        }
    }

    match time {
        Some(time) if missing.is_empty() => Ok(ColumnIndexes { time, mode }),
        _ => Err(LoadError::MissingColumns(missing.into_iter().collect())),
    }
}

fn parse_row(
    record: &StringRecord,
    columns: &ColumnIndexes,
    time_format: Option<&str>,
    mode: &PowerMode,
) -> Option<Sample> {
    let timestamp = parse_timestamp(record.get(columns.time)?, time_format)?;
    let values = columns
        .mode
        .iter()
        .map(|index| record.get(*index).and_then(parse_number))
        .collect::<Option<Vec<f64>>>()?;
    let reading = mode.derive_power(&values)?;

    Some(Sample {
        timestamp,
        power_w: reading.power_w,
        power_without_control_w: reading.power_without_control_w,
    })
}
