// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Traffic Fine Policy Simulation Suite - Counterfactual Decomposition

use serde::{Deserialize, Serialize};

use crate::agent::LaborSupply;
use crate::fines::FineSchedule;
use crate::society::{SimulationError, Society};
use crate::types::{SimConfig, SimulationResults};

// ─── LaborDecomposition ──────────────────────────────────────────────────────

/// Four-way decomposition of the welfare gap between two fine structures.
///
/// Fixing labor supply removes the labor-distortion channel, so the
/// fixed-labor gap is the pure deterrence effect and the residual against
/// the endogenous-labor gap is attributable to labor distortion:
/// `labor_distortion = total_effect − pure_deterrence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborDecomposition {
    pub flat_endogenous: SimulationResults,
    pub flat_fixed: SimulationResults,
    pub income_endogenous: SimulationResults,
    pub income_fixed: SimulationResults,

    pub total_effect: f64,
    pub pure_deterrence: f64,
    pub labor_distortion: f64,

    pub transfer_effect_flat: f64,
    pub transfer_effect_income: f64,
    pub transfer_difference: f64,

    pub preferred_without_labor_response: String,
    pub preferred_with_labor_response: String,
}

/// Run the four societies (two fine structures × endogenous/fixed labor)
/// and decompose the welfare difference.
///
/// Each run is independent — fresh agents, fresh society, no shared state;
/// the decomposition is pure arithmetic on the four totals. Fails if any of
/// the four runs fails.
pub fn decompose_labor_response(
    incomes: &[f64],
    flat: &FineSchedule,
    income_based: &FineSchedule,
    config: &SimConfig,
    fixed_labor_share: f64,
) -> Result<LaborDecomposition, SimulationError> {
    let fixed = LaborSupply::Fixed {
        share: fixed_labor_share,
    };
    let max_iterations = config.max_iterations;

    let run = |fines: &FineSchedule, labor: LaborSupply| {
        Society::with_labor(incomes, fines.clone(), config.clone(), labor)
            .simulate(max_iterations)
    };

    let flat_endogenous = run(flat, LaborSupply::Endogenous)?;
    let flat_fixed = run(flat, fixed)?;
    let income_endogenous = run(income_based, LaborSupply::Endogenous)?;
    let income_fixed = run(income_based, fixed)?;

    let total_effect = income_endogenous.total_utility - flat_endogenous.total_utility;
    let pure_deterrence = income_fixed.total_utility - flat_fixed.total_utility;
    let labor_distortion = total_effect - pure_deterrence;

    let n = incomes.len() as f64;
    let transfer_effect_flat = flat_endogenous.ubi * n;
    let transfer_effect_income = income_endogenous.ubi * n;

    let pick = |gap: f64| {
        if gap > 0.0 { "income_based" } else { "flat" }.to_string()
    };

    Ok(LaborDecomposition {
        preferred_without_labor_response: pick(pure_deterrence),
        preferred_with_labor_response: pick(total_effect),
        flat_endogenous,
        flat_fixed,
        income_endogenous,
        income_fixed,
        total_effect,
        pure_deterrence,
        labor_distortion,
        transfer_effect_flat,
        transfer_effect_income,
        transfer_difference: transfer_effect_income - transfer_effect_flat,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimConfig {
        SimConfig {
            tax_rate: 0.3,
            max_iterations: 5,
            convergence_threshold: 1.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn decomposition_identity_holds() {
        let incomes = [25_000.0, 50_000.0, 75_000.0];
        let flat = FineSchedule::flat(100.0);
        let day_fine = FineSchedule::income_based(50.0, 0.001);

        let d = decompose_labor_response(&incomes, &flat, &day_fine, &config(), 0.5)
            .expect("test: all four runs should succeed");

        assert!(
            (d.labor_distortion - (d.total_effect - d.pure_deterrence)).abs() < 1e-12,
            "decomposition identity violated"
        );
    }

    #[test]
    fn fixed_runs_pin_labor() {
        let incomes = [25_000.0, 75_000.0];
        let flat = FineSchedule::flat(100.0);
        let day_fine = FineSchedule::income_based(50.0, 0.001);

        let d = decompose_labor_response(&incomes, &flat, &day_fine, &config(), 0.5)
            .expect("test: all four runs should succeed");

        let pinned = 0.5 * crate::agent::WORK_HOURS_PER_YEAR;
        for agent in d.flat_fixed.agents.iter().chain(&d.income_fixed.agents) {
            assert_eq!(agent.labor_hours, pinned);
        }
        // Endogenous runs are free to choose differently.
        assert!(d
            .flat_endogenous
            .agents
            .iter()
            .all(|a| (0.0..=crate::agent::WORK_HOURS_PER_YEAR).contains(&a.labor_hours)));
    }

    #[test]
    fn transfer_totals_scale_with_population() {
        let incomes = [25_000.0, 50_000.0, 75_000.0];
        let flat = FineSchedule::flat(100.0);
        let day_fine = FineSchedule::income_based(50.0, 0.001);

        let d = decompose_labor_response(&incomes, &flat, &day_fine, &config(), 0.5)
            .expect("test: all four runs should succeed");

        assert!((d.transfer_effect_flat - d.flat_endogenous.ubi * 3.0).abs() < 1e-9);
        assert!(
            (d.transfer_difference
                - (d.transfer_effect_income - d.transfer_effect_flat))
                .abs()
                < 1e-12
        );
    }
}
