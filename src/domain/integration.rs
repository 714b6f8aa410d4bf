use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::power_mode::PowerMode;
use crate::domain::sample::Sample;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationRule {
    /// Mean of both interval endpoints.
    Trapezoidal,
    /// Interval start value only, for step-like signals.
    LeftRectangle,
}

/// What to do with an interval whose end is not after its start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntervalPolicy {
    #[default]
    SkipNonPositive,
    /// Zero-length intervals are still skipped; a negative one is an error.
    Strict,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("sample {index} is earlier than the sample before it")]
    OutOfOrder { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyTotals {
    pub energy_wh: f64,
    pub energy_without_control_wh: Option<f64>,
}

pub fn integrate(
    samples: &[Sample],
    mode: &PowerMode,
    policy: IntervalPolicy,
) -> Result<EnergyTotals, IntegrationError> {
    let rule = mode.integration_rule();
    let energy_wh = integrate_wh(samples, rule, policy, |sample| sample.power_w)?;

    let energy_without_control_wh = if mode.has_counterfactual() {
        Some(integrate_wh(samples, rule, policy, |sample| {
            sample.power_without_control_w.unwrap_or(0.0)
        })?)
    } else {
        None
    };

    Ok(EnergyTotals {
        energy_wh,
        energy_without_control_wh,
    })
}

/// Integrates `power_of` over consecutive sample pairs and returns watt-hours.
pub fn integrate_wh<F>(
    samples: &[Sample],
    rule: IntegrationRule,
    policy: IntervalPolicy,
    power_of: F,
) -> Result<f64, IntegrationError>
where
    F: Fn(&Sample) -> f64,
{
    let mut watt_seconds = 0.0;

    for (offset, pair) in samples.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let delta = delta_seconds(previous.timestamp, current.timestamp);

        if delta < 0.0 && policy == IntervalPolicy::Strict {
            return Err(IntegrationError::OutOfOrder { index: offset + 1 });
        }
        if delta <= 0.0 {
            tracing::trace!(index = offset + 1, delta, "skipping non-positive interval");
            continue;
        }

        let power_w = match rule {
            IntegrationRule::Trapezoidal => (power_of(previous) + power_of(current)) / 2.0,
            IntegrationRule::LeftRectangle => power_of(previous),
        };
        watt_seconds += power_w * delta;
    }

    Ok(watt_seconds / SECONDS_PER_HOUR)
}

pub fn delta_seconds(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta = end.signed_duration_since(start);
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

pub fn delta_hours(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    delta_seconds(start, end) / SECONDS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::{
        IntegrationError, IntegrationRule, IntervalPolicy, delta_seconds, integrate, integrate_wh,
    };
    use crate::domain::power_mode::PowerMode;
    use crate::domain::sample::Sample;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid base timestamp")
    }

    fn sample_at(minutes: i64, power_w: f64) -> Sample {
        Sample::new(base() + Duration::minutes(minutes), power_w)
    }

    fn percentage_sample(minutes: i64, percentage: f64, rated_power_w: f64) -> Sample {
        let reading = PowerMode::percentage("dim", rated_power_w)
            .derive_power(&[percentage])
            .expect("reading");
        Sample {
            timestamp: base() + Duration::minutes(minutes),
            power_w: reading.power_w,
            power_without_control_w: reading.power_without_control_w,
        }
    }

    fn trapezoid(samples: &[Sample]) -> f64 {
        integrate_wh(
            samples,
            IntegrationRule::Trapezoidal,
            IntervalPolicy::SkipNonPositive,
            |sample| sample.power_w,
        )
        .expect("tolerant integration never fails")
    }

    #[test]
    fn fewer_than_two_samples_yield_zero() {
        let mode = PowerMode::percentage("dim", 60.0);

        assert_eq!(trapezoid(&[]), 0.0);
        assert_eq!(trapezoid(&[sample_at(0, 500.0)]), 0.0);

        let totals = integrate(
            &[percentage_sample(0, 80.0, 60.0)],
            &mode,
            IntervalPolicy::default(),
        )
        .expect("totals");
        assert_eq!(totals.energy_wh, 0.0);
        assert_eq!(totals.energy_without_control_wh, Some(0.0));
    }

    #[test]
    fn constant_power_integrates_exactly() {
        let samples: Vec<Sample> = (0..=12).map(|step| sample_at(step * 15, 250.0)).collect();

        assert_eq!(trapezoid(&samples), 750.0);
    }

    #[test]
    fn linear_ramp_uses_endpoint_average() {
        let samples = vec![sample_at(0, 0.0), sample_at(60, 100.0)];

        assert_eq!(trapezoid(&samples), 50.0);
    }

    #[test]
    fn duplicate_timestamps_contribute_nothing() {
        let samples = vec![
            sample_at(0, 100.0),
            sample_at(0, 10_000.0),
            sample_at(60, 100.0),
        ];

        assert_eq!(trapezoid(&samples), (10_000.0 + 100.0) / 2.0);
    }

    #[test]
    fn tolerant_policy_skips_backwards_interval() {
        let samples = vec![sample_at(60, 100.0), sample_at(0, 100.0), sample_at(30, 100.0)];

        assert_eq!(trapezoid(&samples), 50.0);
    }

    #[test]
    fn strict_policy_rejects_backwards_interval_but_allows_duplicates() {
        let duplicates = vec![sample_at(0, 100.0), sample_at(0, 100.0), sample_at(60, 100.0)];
        let backwards = vec![sample_at(0, 100.0), sample_at(60, 100.0), sample_at(30, 100.0)];

        let ok = integrate_wh(
            &duplicates,
            IntegrationRule::Trapezoidal,
            IntervalPolicy::Strict,
            |sample| sample.power_w,
        );
        let err = integrate_wh(
            &backwards,
            IntegrationRule::Trapezoidal,
            IntervalPolicy::Strict,
            |sample| sample.power_w,
        );

        assert_eq!(ok, Ok(100.0));
        assert_eq!(err, Err(IntegrationError::OutOfOrder { index: 2 }));
    }

    #[test]
    fn voltage_current_pair_integrates_to_twenty_wh() {
        let mode = PowerMode::voltage_current("V", "I");
        let power_w = mode.derive_power(&[10.0, 2.0]).expect("reading").power_w;
        let samples = vec![sample_at(0, power_w), sample_at(60, power_w)];

        let totals = integrate(&samples, &mode, IntervalPolicy::default()).expect("totals");

        assert_eq!(totals.energy_wh, 20.0);
        assert_eq!(totals.energy_without_control_wh, None);
    }

    #[test]
    fn percentage_mode_uses_left_rectangle_for_both_scenarios() {
        let mode = PowerMode::percentage("dim", 60.0);
        let samples = vec![
            percentage_sample(0, 0.0, 60.0),
            percentage_sample(60, 50.0, 60.0),
            percentage_sample(120, 0.0, 60.0),
        ];

        let totals = integrate(&samples, &mode, IntervalPolicy::default()).expect("totals");

        assert!((totals.energy_wh - 30.0).abs() < 1e-9);
        assert_eq!(totals.energy_without_control_wh, Some(60.0));
    }

    #[test]
    fn measures_sub_second_deltas() {
        let start = base();
        let end = start + Duration::milliseconds(1500);

        assert_eq!(delta_seconds(start, end), 1.5);
        assert_eq!(delta_seconds(end, start), -1.5);
    }
}
