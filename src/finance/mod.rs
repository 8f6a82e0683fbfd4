// document-synthesis-service/src/finance/mod.rs

//! Financial projections for a recycling plant: scenario metrics, cash flow,
//! NPV/IRR, sensitivity and government-adjusted results.
//!
//! Everything here is a pure function of [`StudyInput`]; the same input always
//! produces bit-identical numbers.

mod cashflow;
mod input;
mod scenario;
mod sensitivity;

pub use cashflow::{analyze_cash_flow, compute_cash_flow_series, irr, npv, CashFlowAnalysis, CashFlowYear};
pub use input::{
    CapexItems, CarbonBlackBasis, CarbonBlackStream, Financing, MaterialStream, MaterialStreams,
    OpexItems, ScenarioRates, StudyInput,
};
pub use scenario::{
    break_even_utilization, compute_scenario, government_adjusted, monthly_throughput,
    GovernmentAdjusted, Material, MaterialOutput, Payback, Scenario, ScenarioResult,
};
pub use sensitivity::{sensitivity, SensitivityAnalysis, SensitivityFactor, SensitivityRow};

#[cfg(test)]
pub(crate) use input::fixtures;

use serde::{Deserialize, Serialize};

/// Every figure a feasibility document prints, computed once per generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub scenarios: Vec<(Scenario, ScenarioResult)>,
    pub base: ScenarioResult,
    pub cash_flow: CashFlowAnalysis,
    pub sensitivity: SensitivityAnalysis,
    pub government: Option<GovernmentAdjusted>,
    pub break_even_utilization: Option<f64>,
}

impl Projection {
    pub fn scenario(&self, scenario: Scenario) -> &ScenarioResult {
        self.scenarios
            .iter()
            .find(|(s, _)| *s == scenario)
            .map(|(_, r)| r)
            .unwrap_or(&self.base)
    }
}

/// Computes the full projection at the study's own utilization rate.
///
/// Callers are expected to have run [`StudyInput::validate`] first.
pub fn project(input: &StudyInput) -> Projection {
    let scenarios = Scenario::ALL
        .iter()
        .map(|s| (*s, compute_scenario(input, s.utilization_rate(input))))
        .collect();
    let base = compute_scenario(input, input.utilization_rate);
    let cash_flow = analyze_cash_flow(input, &base);
    let sensitivity = sensitivity(input, input.utilization_rate);
    let government = government_adjusted(input, &base);

    Projection {
        scenarios,
        cash_flow,
        sensitivity,
        government,
        break_even_utilization: break_even_utilization(input),
        base,
    }
}
