// document-synthesis-service/src/finance/cashflow.rs

use serde::{Deserialize, Serialize};

use super::input::StudyInput;
use super::scenario::ScenarioResult;

const IRR_LOWER: f64 = -0.99;
const IRR_UPPER: f64 = 10.0;
const IRR_TOLERANCE: f64 = 1e-7;
const IRR_MAX_ITERATIONS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    pub year: u32,
    pub net_cash_flow: f64,
    pub cumulative: f64,
    pub discounted_cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowAnalysis {
    pub years: Vec<CashFlowYear>,
    pub discount_rate: f64,
    pub npv: f64,
    pub irr: Option<f64>,
    /// First year whose cumulative cash flow is non-negative.
    pub payback_year: Option<u32>,
}

/// After-tax cash flow per year, year 0 carrying the investment.
///
/// Depreciation is added back as a non-cash charge and stops once the asset
/// base is written off; working capital is recovered in the final year.
pub fn compute_cash_flow_series(
    input: &StudyInput,
    scenario: &ScenarioResult,
    years: u32,
) -> Vec<CashFlowYear> {
    let rate = input.discount_rate / 100.0;
    let investment = input.total_investment();
    let annual_depreciation = scenario.annual_depreciation();
    let before_depreciation = scenario.annual_ebitda + annual_depreciation;

    let mut remaining_book_value = input.capex.depreciable();
    let mut series = Vec::with_capacity(years as usize + 1);
    series.push(CashFlowYear {
        year: 0,
        net_cash_flow: -investment,
        cumulative: -investment,
        discounted_cumulative: -investment,
    });

    let mut cumulative = -investment;
    let mut discounted = -investment;
    for year in 1..=years {
        let depreciation = annual_depreciation.min(remaining_book_value).max(0.0);
        remaining_book_value -= depreciation;

        let taxable = before_depreciation - depreciation;
        let tax = if taxable > 0.0 {
            taxable * input.tax_rate / 100.0
        } else {
            0.0
        };
        let mut net_cash_flow = before_depreciation - tax;
        if year == years {
            net_cash_flow += input.capex.working_capital;
        }

        cumulative += net_cash_flow;
        discounted += net_cash_flow / (1.0 + rate).powi(year as i32);
        series.push(CashFlowYear {
            year,
            net_cash_flow,
            cumulative,
            discounted_cumulative: discounted,
        });
    }
    series
}

/// Net present value of `flows`, where `flows[0]` is undiscounted.
pub fn npv(rate: f64, flows: &[f64]) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

/// Internal rate of return by bisection over `[-0.99, 10.0]`.
///
/// Returns `None` when the NPV has the same sign at both ends of the bracket.
/// The midpoint of the final bracket is reported once it is narrower than
/// `1e-7` or after 200 halvings; an exact zero at a midpoint ends early.
pub fn irr(flows: &[f64]) -> Option<f64> {
    let mut low = IRR_LOWER;
    let mut high = IRR_UPPER;
    let mut npv_low = npv(low, flows);
    let npv_high = npv(high, flows);
    if !npv_low.is_finite() || !npv_high.is_finite() {
        return None;
    }
    if npv_low == 0.0 {
        return Some(low);
    }
    if npv_low.signum() == npv_high.signum() {
        return None;
    }

    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let npv_mid = npv(mid, flows);
        if npv_mid == 0.0 || (high - low) / 2.0 < IRR_TOLERANCE {
            return Some(mid);
        }
        if npv_mid.signum() == npv_low.signum() {
            low = mid;
            npv_low = npv_mid;
        } else {
            high = mid;
        }
    }
    Some((low + high) / 2.0)
}

pub fn analyze_cash_flow(input: &StudyInput, scenario: &ScenarioResult) -> CashFlowAnalysis {
    let years = compute_cash_flow_series(input, scenario, input.projection_years);
    let flows: Vec<f64> = years.iter().map(|y| y.net_cash_flow).collect();
    let rate = input.discount_rate / 100.0;
    let payback_year = years
        .iter()
        .find(|y| y.year > 0 && y.cumulative >= 0.0)
        .map(|y| y.year);

    CashFlowAnalysis {
        npv: npv(rate, &flows),
        irr: irr(&flows),
        discount_rate: input.discount_rate,
        payback_year,
        years,
    }
}
