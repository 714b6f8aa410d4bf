use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub power_w: f64,
    pub power_without_control_w: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, power_w: f64) -> Self {
        Self {
            timestamp,
            power_w,
            power_without_control_w: None,
        }
    }
}

/// Samples of one file, ascending by timestamp, plus the number of data rows
/// that were dropped while reading it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedSamples {
    pub samples: Vec<Sample>,
    pub skipped_rows: usize,
}
