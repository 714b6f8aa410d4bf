use std::sync::Arc;

use thiserror::Error;

use crate::domain::counterfactual::{CounterfactualPolicy, FullPowerWhenActive};
use crate::domain::integration::IntegrationRule;

pub const DEFAULT_POWER_COLUMN: &str = "power";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PowerModeError {
    #[error("a power column or both voltage and current columns are required")]
    Incomplete,
    #[error("power modes are mutually exclusive, got: {}", .0.join(", "))]
    Conflicting(Vec<&'static str>),
    #[error("percentage mode requires a rated power in watts")]
    MissingRatedPower,
    #[error("rated power must be a positive number of watts, got {0}")]
    InvalidRatedPower(f64),
    #[error("power scale must be a finite number, got {0}")]
    InvalidScale(f64),
    #[error("power scale only applies to the power column mode")]
    ScaleWithoutPowerColumn,
}

/// How instantaneous power is derived from one CSV row.
#[derive(Debug, Clone)]
pub enum PowerMode {
    Direct {
        column: String,
        scale: f64,
    },
    VoltageCurrent {
        voltage_column: String,
        current_column: String,
    },
    Percentage {
        column: String,
        rated_power_w: f64,
        counterfactual: Arc<dyn CounterfactualPolicy>,
    },
}

/// Power derived from the mode columns of a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    pub power_w: f64,
    pub power_without_control_w: Option<f64>,
}

/// Raw, possibly contradictory column choices as they arrive from flags or
/// the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSelection {
    pub power_column: Option<String>,
    pub power_scale: Option<f64>,
    pub voltage_column: Option<String>,
    pub current_column: Option<String>,
    pub percentage_column: Option<String>,
    pub rated_power_w: Option<f64>,
}

impl PowerMode {
    pub fn direct(column: impl Into<String>) -> Self {
        Self::Direct {
            column: column.into(),
            scale: 1.0,
        }
    }

    pub fn voltage_current(
        voltage_column: impl Into<String>,
        current_column: impl Into<String>,
    ) -> Self {
        Self::VoltageCurrent {
            voltage_column: voltage_column.into(),
            current_column: current_column.into(),
        }
    }

    pub fn percentage(column: impl Into<String>, rated_power_w: f64) -> Self {
        Self::Percentage {
            column: column.into(),
            rated_power_w,
            counterfactual: Arc::new(FullPowerWhenActive),
        }
    }

    pub fn from_selection(selection: &PowerSelection) -> Result<Self, PowerModeError> {
        let power_column = non_empty(selection.power_column.as_deref());
        let voltage_column = non_empty(selection.voltage_column.as_deref());
        let current_column = non_empty(selection.current_column.as_deref());
        let percentage_column = non_empty(selection.percentage_column.as_deref());

        let mut selected = Vec::new();
        if power_column.is_some() {
            selected.push("power");
        }
        if voltage_column.is_some() || current_column.is_some() {
            selected.push("voltage/current");
        }
        if percentage_column.is_some() {
            selected.push("percentage");
        }
        if selected.len() > 1 {
            return Err(PowerModeError::Conflicting(selected));
        }

        if selection.power_scale.is_some() && power_column.is_none() && !selected.is_empty() {
            return Err(PowerModeError::ScaleWithoutPowerColumn);
        }

        if let Some(column) = percentage_column {
            let rated_power_w = selection
                .rated_power_w
                .ok_or(PowerModeError::MissingRatedPower)?;
            let mode = Self::percentage(column, rated_power_w);
            mode.validate()?;
            return Ok(mode);
        }

        let mode = match (voltage_column, current_column) {
            (Some(voltage), Some(current)) => Self::voltage_current(voltage, current),
            (None, None) => Self::Direct {
                column: power_column.unwrap_or(DEFAULT_POWER_COLUMN).to_string(),
                scale: selection.power_scale.unwrap_or(1.0),
            },
            _ => return Err(PowerModeError::Incomplete),
        };
        mode.validate()?;
        Ok(mode)
    }

    pub fn validate(&self) -> Result<(), PowerModeError> {
        match self {
            Self::Direct { column, scale } => {
                if column.trim().is_empty() {
                    return Err(PowerModeError::Incomplete);
                }
                if !scale.is_finite() {
                    return Err(PowerModeError::InvalidScale(*scale));
                }
            }
            Self::VoltageCurrent {
                voltage_column,
                current_column,
            } => {
                if voltage_column.trim().is_empty() || current_column.trim().is_empty() {
                    return Err(PowerModeError::Incomplete);
                }
            }
            Self::Percentage {
                column,
                rated_power_w,
                ..
            } => {
                if column.trim().is_empty() {
                    return Err(PowerModeError::Incomplete);
                }
                if !rated_power_w.is_finite() || *rated_power_w <= 0.0 {
                    return Err(PowerModeError::InvalidRatedPower(*rated_power_w));
                }
            }
        }

        Ok(())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "power",
            Self::VoltageCurrent { .. } => "voltage-current",
            Self::Percentage { .. } => "percentage",
        }
    }

    /// Columns the mode reads, in the order `derive_power` expects them.
    pub fn required_columns(&self) -> Vec<&str> {
        match self {
            Self::Direct { column, .. } => vec![column.as_str()],
            Self::VoltageCurrent {
                voltage_column,
                current_column,
            } => vec![voltage_column.as_str(), current_column.as_str()],
            Self::Percentage { column, .. } => vec![column.as_str()],
        }
    }

    pub fn integration_rule(&self) -> IntegrationRule {
        match self {
            Self::Percentage { .. } => IntegrationRule::LeftRectangle,
            _ => IntegrationRule::Trapezoidal,
        }
    }

    pub fn has_counterfactual(&self) -> bool {
        matches!(self, Self::Percentage { .. })
    }

    /// Name of the without-control model, in percentage mode only.
    pub fn counterfactual_name(&self) -> Option<&'static str> {
        match self {
            Self::Percentage { counterfactual, .. } => Some(counterfactual.name()),
            _ => None,
        }
    }

    pub fn derive_power(&self, values: &[f64]) -> Option<PowerReading> {
        match self {
            Self::Direct { scale, .. } => {
                let raw = *values.first()?;
                Some(PowerReading {
                    power_w: raw * scale,
                    power_without_control_w: None,
                })
            }
            Self::VoltageCurrent { .. } => {
                let [voltage, current] = values else {
                    return None;
                };
                Some(PowerReading {
                    power_w: voltage * current,
                    power_without_control_w: None,
                })
            }
            Self::Percentage {
                rated_power_w,
                counterfactual,
                ..
            } => {
                let percentage = *values.first()?;
                Some(PowerReading {
                    power_w: percentage.max(0.0) / 100.0 * rated_power_w,
                    power_without_control_w: Some(
                        counterfactual.power_without_control_w(percentage, *rated_power_w),
                    ),
                })
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
