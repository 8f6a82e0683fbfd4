// document-synthesis-service/src/finance/input.rs

use serde::{Deserialize, Serialize};

use crate::error::{DocumentError, Result};

/// Plant and financial parameters of one feasibility study.
///
/// Percentages are expressed as 0–100, monetary values in the study currency.
/// OPEX items are monthly, CAPEX items are one-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyInput {
    pub project_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub daily_capacity: f64,
    #[serde(default = "default_operating_days")]
    pub operating_days: f64,
    #[serde(default = "default_operating_hours")]
    pub operating_hours_per_day: f64,
    #[serde(default = "default_probable_rate")]
    pub utilization_rate: f64,
    #[serde(default)]
    pub scenarios: ScenarioRates,
    pub capex: CapexItems,
    pub opex: OpexItems,
    pub materials: MaterialStreams,
    #[serde(default)]
    pub variable_cost_pct: f64,
    #[serde(default)]
    pub financing: Financing,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,
    #[serde(default = "default_depreciation_years")]
    pub depreciation_years: f64,
    #[serde(default = "default_projection_years")]
    pub projection_years: u32,
    #[serde(default)]
    pub government_royalty_pct: Option<f64>,
    #[serde(default)]
    pub environmental_bonus_per_ton: Option<f64>,
}

/// Utilization rates (%) of the three named scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRates {
    pub pessimistic: f64,
    pub probable: f64,
    pub optimistic: f64,
}

impl Default for ScenarioRates {
    fn default() -> Self {
        Self {
            pessimistic: 70.0,
            probable: default_probable_rate(),
            optimistic: 95.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapexItems {
    pub equipment: f64,
    #[serde(default)]
    pub installation: f64,
    #[serde(default)]
    pub infrastructure: f64,
    #[serde(default)]
    pub working_capital: f64,
}

impl CapexItems {
    pub fn total(&self) -> f64 {
        self.equipment + self.installation + self.infrastructure + self.working_capital
    }

    /// Working capital is recovered, not depreciated.
    pub fn depreciable(&self) -> f64 {
        self.equipment + self.installation + self.infrastructure
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpexItems {
    #[serde(default)]
    pub labor: f64,
    #[serde(default)]
    pub energy: f64,
    #[serde(default)]
    pub maintenance: f64,
    #[serde(default)]
    pub logistics: f64,
    #[serde(default)]
    pub admin: f64,
    #[serde(default)]
    pub other: f64,
}

impl OpexItems {
    pub fn monthly_total(&self) -> f64 {
        self.labor + self.energy + self.maintenance + self.logistics + self.admin + self.other
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financing {
    /// Share of the total investment that is debt-financed (%).
    #[serde(default)]
    pub financed_pct: f64,
    /// Annual interest rate on the financed amount (%).
    #[serde(default)]
    pub interest_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStream {
    pub yield_pct: f64,
    pub price_per_ton: f64,
}

/// How the recovered carbon black yield relates to the other streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonBlackBasis {
    /// Yield is the share of the rubber stream that is pyrolysed; that mass is
    /// no longer sold as rubber.
    #[default]
    RubberStream,
    /// Yield is a share of total throughput, additive to the other streams.
    Throughput,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonBlackStream {
    pub yield_pct: f64,
    pub price_per_ton: f64,
    #[serde(default)]
    pub basis: CarbonBlackBasis,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStreams {
    pub rubber: MaterialStream,
    pub steel: MaterialStream,
    pub textile: MaterialStream,
    #[serde(default)]
    pub carbon_black: Option<CarbonBlackStream>,
}

impl MaterialStreams {
    /// Rubber + steel + textile, in percent of throughput.
    pub fn base_yield_pct(&self) -> f64 {
        self.rubber.yield_pct + self.steel.yield_pct + self.textile.yield_pct
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_operating_days() -> f64 {
    300.0
}

fn default_operating_hours() -> f64 {
    24.0
}

fn default_probable_rate() -> f64 {
    85.0
}

fn default_tax_rate() -> f64 {
    34.0
}

fn default_discount_rate() -> f64 {
    12.0
}

fn default_depreciation_years() -> f64 {
    10.0
}

fn default_projection_years() -> u32 {
    10
}

impl StudyInput {
    pub fn total_investment(&self) -> f64 {
        self.capex.total()
    }

    pub fn has_government_terms(&self) -> bool {
        self.government_royalty_pct.unwrap_or(0.0) != 0.0
            || self.environmental_bonus_per_ton.unwrap_or(0.0) != 0.0
    }

    /// Rejects inputs for which the projection formulas are undefined.
    pub fn validate(&self) -> Result<()> {
        let numbers = [
            ("dailyCapacity", self.daily_capacity),
            ("operatingDays", self.operating_days),
            ("operatingHoursPerDay", self.operating_hours_per_day),
            ("utilizationRate", self.utilization_rate),
            ("capex.equipment", self.capex.equipment),
            ("capex.installation", self.capex.installation),
            ("capex.infrastructure", self.capex.infrastructure),
            ("capex.workingCapital", self.capex.working_capital),
            ("opex.labor", self.opex.labor),
            ("opex.energy", self.opex.energy),
            ("opex.maintenance", self.opex.maintenance),
            ("opex.logistics", self.opex.logistics),
            ("opex.admin", self.opex.admin),
            ("opex.other", self.opex.other),
            ("variableCostPct", self.variable_cost_pct),
            ("financing.financedPct", self.financing.financed_pct),
            ("financing.interestRate", self.financing.interest_rate),
            ("taxRate", self.tax_rate),
            ("discountRate", self.discount_rate),
            ("depreciationYears", self.depreciation_years),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be a non-negative number")));
            }
        }

        if self.daily_capacity == 0.0 {
            return Err(invalid("dailyCapacity must be positive"));
        }
        if self.operating_days == 0.0 || self.operating_days > 366.0 {
            return Err(invalid("operatingDays must be between 1 and 366"));
        }
        if self.operating_hours_per_day == 0.0 || self.operating_hours_per_day > 24.0 {
            return Err(invalid("operatingHoursPerDay must be between 1 and 24"));
        }
        if self.depreciation_years == 0.0 {
            return Err(invalid("depreciationYears must be positive"));
        }
        if self.projection_years == 0 || self.projection_years > 50 {
            return Err(invalid("projectionYears must be between 1 and 50"));
        }
        if self.total_investment() <= 0.0 {
            return Err(invalid("total investment must be positive"));
        }

        for (name, pct) in [
            ("utilizationRate", self.utilization_rate),
            ("scenarios.pessimistic", self.scenarios.pessimistic),
            ("scenarios.probable", self.scenarios.probable),
            ("scenarios.optimistic", self.scenarios.optimistic),
            ("variableCostPct", self.variable_cost_pct),
            ("financing.financedPct", self.financing.financed_pct),
            ("taxRate", self.tax_rate),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(invalid(format!("{name} must be between 0 and 100")));
            }
        }

        let streams = [
            ("rubber", self.materials.rubber),
            ("steel", self.materials.steel),
            ("textile", self.materials.textile),
        ];
        for (name, stream) in streams {
            check_stream(name, stream.yield_pct, stream.price_per_ton)?;
        }

        let mut mass_pct = self.materials.base_yield_pct();
        if let Some(cb) = self.materials.carbon_black {
            check_stream("carbonBlack", cb.yield_pct, cb.price_per_ton)?;
            if cb.basis == CarbonBlackBasis::Throughput {
                mass_pct += cb.yield_pct;
            }
        }
        if mass_pct > 100.0 + 1e-9 {
            return Err(invalid(format!(
                "material yields add up to {mass_pct:.1}% of throughput"
            )));
        }

        if let Some(royalty) = self.government_royalty_pct {
            if !royalty.is_finite() || !(0.0..=100.0).contains(&royalty) {
                return Err(invalid("governmentRoyaltyPct must be between 0 and 100"));
            }
        }
        if let Some(bonus) = self.environmental_bonus_per_ton {
            if !bonus.is_finite() || bonus < 0.0 {
                return Err(invalid("environmentalBonusPerTon must be non-negative"));
            }
        }

        Ok(())
    }
}

fn check_stream(name: &str, yield_pct: f64, price: f64) -> Result<()> {
    if !yield_pct.is_finite() || !(0.0..=100.0).contains(&yield_pct) {
        return Err(invalid(format!("{name} yield must be between 0 and 100")));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(invalid(format!("{name} price must be non-negative")));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> DocumentError {
    DocumentError::InvalidStudyInput(message.into())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// 85 t/day plant used across the finance tests.
    pub fn reference_study() -> StudyInput {
        StudyInput {
            project_name: "Reference Plant".to_string(),
            country: "Brazil".to_string(),
            currency: "USD".to_string(),
            daily_capacity: 85.0,
            operating_days: 300.0,
            operating_hours_per_day: 24.0,
            utilization_rate: 85.0,
            scenarios: ScenarioRates::default(),
            capex: CapexItems {
                equipment: 2_800_000.0,
                installation: 350_000.0,
                infrastructure: 600_000.0,
                working_capital: 250_000.0,
            },
            opex: OpexItems {
                labor: 55_000.0,
                energy: 38_000.0,
                maintenance: 18_000.0,
                logistics: 22_000.0,
                admin: 12_000.0,
                other: 5_000.0,
            },
            materials: MaterialStreams {
                rubber: MaterialStream { yield_pct: 74.7, price_per_ton: 240.0 },
                steel: MaterialStream { yield_pct: 15.0, price_per_ton: 180.0 },
                textile: MaterialStream { yield_pct: 10.3, price_per_ton: 20.0 },
                carbon_black: None,
            },
            variable_cost_pct: 5.0,
            financing: Financing { financed_pct: 0.0, interest_rate: 0.0 },
            tax_rate: 34.0,
            discount_rate: 12.0,
            depreciation_years: 10.0,
            projection_years: 10,
            government_royalty_pct: None,
            environmental_bonus_per_ton: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::reference_study;
    use super::*;

    #[test]
    fn reference_study_is_valid() {
        assert!(reference_study().validate().is_ok());
    }

    #[test]
    fn zero_investment_is_rejected() {
        let mut study = reference_study();
        study.capex = CapexItems::default();
        let err = study.validate().unwrap_err();
        assert!(matches!(err, DocumentError::InvalidStudyInput(_)));
    }

    #[test]
    fn additive_carbon_black_counts_towards_mass_balance() {
        let mut study = reference_study();
        study.materials.carbon_black = Some(CarbonBlackStream {
            yield_pct: 5.0,
            price_per_ton: 900.0,
            basis: CarbonBlackBasis::Throughput,
        });
        assert!(study.validate().is_err());

        study.materials.carbon_black = Some(CarbonBlackStream {
            yield_pct: 5.0,
            price_per_ton: 900.0,
            basis: CarbonBlackBasis::RubberStream,
        });
        assert!(study.validate().is_ok());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut study = reference_study();
        study.opex.energy = f64::NAN;
        assert!(study.validate().is_err());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let json = serde_json::json!({
            "projectName": "Minimal",
            "dailyCapacity": 40.0,
            "capex": { "equipment": 1000000.0 },
            "opex": { "labor": 20000.0 },
            "materials": {
                "rubber": { "yieldPct": 70.0, "pricePerTon": 200.0 },
                "steel": { "yieldPct": 20.0, "pricePerTon": 150.0 },
                "textile": { "yieldPct": 10.0, "pricePerTon": 0.0 }
            }
        });
        let study: StudyInput = serde_json::from_value(json).unwrap();
        assert_eq!(study.operating_days, 300.0);
        assert_eq!(study.operating_hours_per_day, 24.0);
        assert_eq!(study.scenarios, ScenarioRates::default());
        assert!(study.validate().is_ok());
    }
}
