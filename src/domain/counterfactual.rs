use std::fmt::Debug;

/// Models the power a percentage-controlled load would draw without control.
pub trait CounterfactualPolicy: Debug + Send + Sync {
    fn name(&self) -> &'static str;
    fn power_without_control_w(&self, percentage: f64, rated_power_w: f64) -> f64;
}

/// Full rated power whenever any demand is present, zero otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullPowerWhenActive;

impl CounterfactualPolicy for FullPowerWhenActive {
    fn name(&self) -> &'static str {
        "full-power-when-active"
    }

    fn power_without_control_w(&self, percentage: f64, rated_power_w: f64) -> f64 {
        if percentage > 0.0 { rated_power_w } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::{CounterfactualPolicy, FullPowerWhenActive};

    #[test]
    fn full_power_when_any_demand_is_present() {
        let policy = FullPowerWhenActive;

        assert_eq!(policy.power_without_control_w(0.5, 60.0), 60.0);
        assert_eq!(policy.power_without_control_w(100.0, 60.0), 60.0);
    }

    #[test]
    fn zero_power_without_demand() {
        let policy = FullPowerWhenActive;

        assert_eq!(policy.power_without_control_w(0.0, 60.0), 0.0);
        assert_eq!(policy.power_without_control_w(-3.0, 60.0), 0.0);
    }
}
