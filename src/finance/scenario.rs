// document-synthesis-service/src/finance/scenario.rs

use serde::{Deserialize, Serialize};

use super::input::{CarbonBlackBasis, StudyInput};

/// Named utilization assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Pessimistic,
    Probable,
    Optimistic,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Pessimistic, Scenario::Probable, Scenario::Optimistic];

    pub fn utilization_rate(&self, input: &StudyInput) -> f64 {
        match self {
            Scenario::Pessimistic => input.scenarios.pessimistic,
            Scenario::Probable => input.scenarios.probable,
            Scenario::Optimistic => input.scenarios.optimistic,
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Scenario::Pessimistic => "scenario.pessimistic",
            Scenario::Probable => "scenario.probable",
            Scenario::Optimistic => "scenario.optimistic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Rubber,
    Steel,
    Textile,
    CarbonBlack,
}

impl Material {
    pub fn label_key(&self) -> &'static str {
        match self {
            Material::Rubber => "material.rubber",
            Material::Steel => "material.steel",
            Material::Textile => "material.textile",
            Material::CarbonBlack => "material.carbon_black",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialOutput {
    pub material: Material,
    pub monthly_tons: f64,
    pub price_per_ton: f64,
    pub monthly_revenue: f64,
}

/// Months needed to recover the investment, if operations recover it at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "months")]
pub enum Payback {
    Months(f64),
    Undefined,
}

impl Payback {
    fn from_monthly_result(investment: f64, monthly: f64) -> Self {
        if investment > 0.0 && monthly > 0.0 {
            Payback::Months(investment / monthly)
        } else {
            Payback::Undefined
        }
    }

    pub fn months(&self) -> Option<f64> {
        match self {
            Payback::Months(m) => Some(*m),
            Payback::Undefined => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub utilization_rate: f64,
    pub monthly_tons: f64,
    pub annual_tons: f64,
    pub materials: Vec<MaterialOutput>,
    pub monthly_revenue: f64,
    pub annual_revenue: f64,
    pub monthly_opex: f64,
    pub monthly_variable_costs: f64,
    pub monthly_financing: f64,
    pub monthly_depreciation: f64,
    pub monthly_ebitda: f64,
    pub annual_ebitda: f64,
    pub annual_net_profit: f64,
    pub roi_pct: f64,
    pub payback: Payback,
    pub contribution_margin_pct: f64,
}

impl ScenarioResult {
    pub fn annual_depreciation(&self) -> f64 {
        self.monthly_depreciation * 12.0
    }
}

/// Tons processed per month at the given utilization (%).
pub fn monthly_throughput(input: &StudyInput, utilization_rate: f64) -> f64 {
    let kg_per_hour = input.daily_capacity * 1000.0 / input.operating_hours_per_day;
    let days_per_month = input.operating_days / 12.0;
    let effective_hours = input.operating_hours_per_day * days_per_month * (utilization_rate / 100.0);
    kg_per_hour * effective_hours / 1000.0
}

fn material_outputs(input: &StudyInput, throughput: f64) -> Vec<MaterialOutput> {
    let streams = &input.materials;
    let mut rubber_tons = throughput * streams.rubber.yield_pct / 100.0;

    let carbon_black = streams.carbon_black.map(|cb| {
        let tons = match cb.basis {
            CarbonBlackBasis::RubberStream => {
                let pyrolysed = rubber_tons * cb.yield_pct / 100.0;
                rubber_tons -= pyrolysed;
                pyrolysed
            }
            CarbonBlackBasis::Throughput => throughput * cb.yield_pct / 100.0,
        };
        (tons, cb.price_per_ton)
    });

    let mut outputs = vec![
        output(Material::Rubber, rubber_tons, streams.rubber.price_per_ton),
        output(
            Material::Steel,
            throughput * streams.steel.yield_pct / 100.0,
            streams.steel.price_per_ton,
        ),
        output(
            Material::Textile,
            throughput * streams.textile.yield_pct / 100.0,
            streams.textile.price_per_ton,
        ),
    ];
    if let Some((tons, price)) = carbon_black {
        outputs.push(output(Material::CarbonBlack, tons, price));
    }
    outputs
}

fn output(material: Material, monthly_tons: f64, price_per_ton: f64) -> MaterialOutput {
    MaterialOutput {
        material,
        monthly_tons,
        price_per_ton,
        monthly_revenue: monthly_tons * price_per_ton,
    }
}

/// Full metric set for one utilization rate (%).
pub fn compute_scenario(input: &StudyInput, utilization_rate: f64) -> ScenarioResult {
    let monthly_tons = monthly_throughput(input, utilization_rate);
    let materials = material_outputs(input, monthly_tons);
    let monthly_revenue: f64 = materials.iter().map(|m| m.monthly_revenue).sum();

    let investment = input.total_investment();
    let monthly_opex = input.opex.monthly_total();
    let monthly_variable_costs = monthly_revenue * input.variable_cost_pct / 100.0;
    let monthly_financing =
        investment * (input.financing.financed_pct / 100.0) * (input.financing.interest_rate / 100.0) / 12.0;
    let monthly_depreciation = if input.depreciation_years > 0.0 {
        input.capex.depreciable() / (input.depreciation_years * 12.0)
    } else {
        0.0
    };

    let monthly_ebitda =
        monthly_revenue - monthly_opex - monthly_variable_costs - monthly_financing - monthly_depreciation;
    let annual_ebitda = monthly_ebitda * 12.0;
    let annual_net_profit = after_tax(annual_ebitda, input.tax_rate);

    let roi_pct = if investment > 0.0 {
        annual_ebitda / investment * 100.0
    } else {
        0.0
    };
    let contribution_margin_pct = if monthly_revenue > 0.0 {
        (monthly_revenue - monthly_variable_costs) / monthly_revenue * 100.0
    } else {
        0.0
    };

    ScenarioResult {
        utilization_rate,
        monthly_tons,
        annual_tons: monthly_tons * 12.0,
        materials,
        monthly_revenue,
        annual_revenue: monthly_revenue * 12.0,
        monthly_opex,
        monthly_variable_costs,
        monthly_financing,
        monthly_depreciation,
        monthly_ebitda,
        annual_ebitda,
        annual_net_profit,
        roi_pct,
        payback: Payback::from_monthly_result(investment, monthly_ebitda),
        contribution_margin_pct,
    }
}

/// Tax applies to positive results only.
pub(crate) fn after_tax(result: f64, tax_rate: f64) -> f64 {
    if result > 0.0 {
        result * (1.0 - tax_rate / 100.0)
    } else {
        result
    }
}

/// Utilization (%) at which monthly EBITDA reaches zero.
pub fn break_even_utilization(input: &StudyInput) -> Option<f64> {
    // EBITDA is affine in utilization.
    let at_zero = compute_scenario(input, 0.0).monthly_ebitda;
    let at_full = compute_scenario(input, 100.0).monthly_ebitda;
    let slope = (at_full - at_zero) / 100.0;
    if slope <= 0.0 {
        return None;
    }
    let rate = -at_zero / slope;
    (0.0..=100.0).contains(&rate).then_some(rate)
}

/// Result set under government royalty and environmental bonus terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernmentAdjusted {
    pub royalty_pct: f64,
    pub bonus_per_ton: f64,
    pub monthly_royalty: f64,
    pub monthly_bonus: f64,
    pub monthly_net_revenue: f64,
    pub annual_ebitda: f64,
    pub roi_pct: f64,
    pub payback: Payback,
}

pub fn government_adjusted(input: &StudyInput, base: &ScenarioResult) -> Option<GovernmentAdjusted> {
    if !input.has_government_terms() {
        return None;
    }
    let royalty_pct = input.government_royalty_pct.unwrap_or(0.0);
    let bonus_per_ton = input.environmental_bonus_per_ton.unwrap_or(0.0);

    let monthly_royalty = base.monthly_revenue * royalty_pct / 100.0;
    let monthly_bonus = base.monthly_tons * bonus_per_ton;
    let monthly_ebitda = base.monthly_ebitda - monthly_royalty + monthly_bonus;
    let investment = input.total_investment();

    Some(GovernmentAdjusted {
        royalty_pct,
        bonus_per_ton,
        monthly_royalty,
        monthly_bonus,
        monthly_net_revenue: base.monthly_revenue - monthly_royalty + monthly_bonus,
        annual_ebitda: monthly_ebitda * 12.0,
        roi_pct: if investment > 0.0 {
            monthly_ebitda * 12.0 / investment * 100.0
        } else {
            0.0
        },
        payback: Payback::from_monthly_result(investment, monthly_ebitda),
    })
}
