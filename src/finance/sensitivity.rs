// document-synthesis-service/src/finance/sensitivity.rs

use serde::{Deserialize, Serialize};

use super::input::StudyInput;
use super::scenario::compute_scenario;

pub const PERTURBATION: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityFactor {
    Price,
    Capacity,
    Opex,
}

impl SensitivityFactor {
    pub const ALL: [SensitivityFactor; 3] = [
        SensitivityFactor::Price,
        SensitivityFactor::Capacity,
        SensitivityFactor::Opex,
    ];

    pub fn label_key(&self) -> &'static str {
        match self {
            SensitivityFactor::Price => "sensitivity.price",
            SensitivityFactor::Capacity => "sensitivity.capacity",
            SensitivityFactor::Opex => "sensitivity.opex",
        }
    }

    fn apply(&self, input: &StudyInput, factor: f64) -> StudyInput {
        let mut perturbed = input.clone();
        match self {
            SensitivityFactor::Price => {
                let m = &mut perturbed.materials;
                m.rubber.price_per_ton *= factor;
                m.steel.price_per_ton *= factor;
                m.textile.price_per_ton *= factor;
                if let Some(cb) = m.carbon_black.as_mut() {
                    cb.price_per_ton *= factor;
                }
            }
            SensitivityFactor::Capacity => perturbed.daily_capacity *= factor,
            SensitivityFactor::Opex => {
                let o = &mut perturbed.opex;
                o.labor *= factor;
                o.energy *= factor;
                o.maintenance *= factor;
                o.logistics *= factor;
                o.admin *= factor;
                o.other *= factor;
            }
        }
        perturbed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub factor: SensitivityFactor,
    pub roi_minus: f64,
    pub roi_plus: f64,
    /// ROI change in percentage points against the base case.
    pub delta_minus: f64,
    pub delta_plus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityAnalysis {
    pub utilization_rate: f64,
    pub base_roi: f64,
    pub rows: Vec<SensitivityRow>,
}

/// ROI under ±20 % of each factor, all other inputs held fixed.
pub fn sensitivity(input: &StudyInput, utilization_rate: f64) -> SensitivityAnalysis {
    let base_roi = compute_scenario(input, utilization_rate).roi_pct;
    let rows = SensitivityFactor::ALL
        .iter()
        .map(|factor| {
            let roi_minus =
                compute_scenario(&factor.apply(input, 1.0 - PERTURBATION), utilization_rate).roi_pct;
            let roi_plus =
                compute_scenario(&factor.apply(input, 1.0 + PERTURBATION), utilization_rate).roi_pct;
            SensitivityRow {
                factor: *factor,
                roi_minus,
                roi_plus,
                delta_minus: roi_minus - base_roi,
                delta_plus: roi_plus - base_roi,
            }
        })
        .collect();

    SensitivityAnalysis {
        utilization_rate,
        base_roi,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::input::fixtures::reference_study;

    fn row(analysis: &SensitivityAnalysis, factor: SensitivityFactor) -> SensitivityRow {
        *analysis.rows.iter().find(|r| r.factor == factor).unwrap()
    }

    #[test]
    fn price_and_capacity_move_roi_with_the_perturbation() {
        let analysis = sensitivity(&reference_study(), 85.0);
        for factor in [SensitivityFactor::Price, SensitivityFactor::Capacity] {
            let r = row(&analysis, factor);
            assert!(r.delta_minus < 0.0);
            assert!(r.delta_plus > 0.0);
        }
    }

    #[test]
    fn opex_moves_roi_against_the_perturbation() {
        let analysis = sensitivity(&reference_study(), 85.0);
        let r = row(&analysis, SensitivityFactor::Opex);
        assert!(r.delta_minus > 0.0);
        assert!(r.delta_plus < 0.0);
        // Fixed OPEX enters EBITDA linearly.
        assert!((r.delta_minus + r.delta_plus).abs() < 1e-9);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let study = reference_study();
        let before = study.clone();
        let _ = sensitivity(&study, 85.0);
        assert_eq!(study, before);
    }
}
