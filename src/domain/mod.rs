pub mod counterfactual;
pub mod integration;
pub mod power_mode;
pub mod report;
pub mod sample;
pub mod values;
