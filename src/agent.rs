// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Traffic Fine Policy Simulation Suite - Agent Decision Model

use serde::{Deserialize, Serialize};

use crate::fines::FineSchedule;
use crate::solver::{self, SolverError};

/// Standard full-time hours (52 weeks x 40 hours).
pub const WORK_HOURS_PER_YEAR: f64 = 2080.0;

/// Floor applied to net income before the log so the utility stays defined.
pub(crate) const NET_INCOME_FLOOR: f64 = 1e-10;

// ─── PolicyContext ───────────────────────────────────────────────────────────

/// Aggregate conditions an agent optimizes against.
///
/// Mean-field coupling: agents never see each other, only these scalars
/// (derived from the previous iteration's aggregates).
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext {
    pub death_prob: f64,
    pub ubi: f64,
    pub tax_rate: f64,
    pub vsl: f64,
}

// ─── LaborSupply ─────────────────────────────────────────────────────────────

/// Labor-supply channel for a run.
///
/// `Fixed` pins hours to a share of full time and optimizes speeding alone —
/// the counterfactual that isolates pure deterrence from labor distortion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LaborSupply {
    Endogenous,
    Fixed { share: f64 },
}

// ─── AgentProfile / AgentState ───────────────────────────────────────────────

/// Immutable identity of one agent: earning capacity and utility weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub potential_income: f64,
    pub wage_rate: f64,
    pub income_utility_factor: f64,
    pub labor_disutility_factor: f64,
    pub speeding_utility_factor: f64,
}

/// One iteration's decision snapshot. Replaced wholesale every iteration;
/// never shared across runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub labor_hours: f64,
    pub speeding: f64,
    pub fine_paid: f64,
    pub utility: f64,
}

impl AgentProfile {
    pub fn new(
        potential_income: f64,
        income_utility_factor: f64,
        labor_disutility_factor: f64,
        speeding_utility_factor: f64,
    ) -> Self {
        Self {
            potential_income,
            wage_rate: potential_income / WORK_HOURS_PER_YEAR,
            income_utility_factor,
            labor_disutility_factor,
            speeding_utility_factor,
        }
    }

    /// Utility of a (labor, speeding) choice under the given schedule and
    /// aggregate conditions. Pure function, no side effects.
    ///
    /// `u = w_y·ln(1+net) + w_s·ln(1+s) − w_l·h²/(2H) − p_death·s·VSL`
    /// with `net = gross − fine·s − tax·gross + ubi`, floored just above
    /// zero so the log stays defined.
    pub fn utility(
        &self,
        labor_hours: f64,
        speeding: f64,
        fines: &FineSchedule,
        ctx: &PolicyContext,
    ) -> f64 {
        let gross_income = self.wage_rate * labor_hours;
        let fine = fines.calculate_fine(gross_income) * speeding;
        let tax = gross_income * ctx.tax_rate;
        let net_income = (gross_income - fine - tax + ctx.ubi).max(NET_INCOME_FLOOR);

        let income_utility = self.income_utility_factor * (1.0 + net_income).ln();
        let speeding_utility = self.speeding_utility_factor * (1.0 + speeding).ln();
        let labor_disutility =
            self.labor_disutility_factor * labor_hours * labor_hours / (2.0 * WORK_HOURS_PER_YEAR);
        let death_cost = ctx.death_prob * speeding * ctx.vsl;

        income_utility + speeding_utility - labor_disutility - death_cost
    }

    /// Solve the agent's constrained choice problem and return the new
    /// decision snapshot.
    ///
    /// Endogenous labor: 2D maximization over [0, H] × [0, 1] from the box
    /// midpoint, projected gradient first, derivative-free simplex as the
    /// fallback. Both failing is a hard optimization failure — the caller
    /// aborts the whole run rather than accept an unconverged agent.
    pub fn decide(
        &self,
        fines: &FineSchedule,
        ctx: &PolicyContext,
        labor: LaborSupply,
    ) -> Result<AgentState, SolverError> {
        match labor {
            LaborSupply::Endogenous => {
                let objective =
                    |x: &[f64]| -self.utility(x[0], x[1], fines, ctx);
                let bounds = [(0.0, WORK_HOURS_PER_YEAR), (0.0, 1.0)];
                let start = [WORK_HOURS_PER_YEAR / 2.0, 0.5];

                let solution = match solver::minimize_gradient(&objective, &bounds, &start) {
                    Ok(solution) => solution,
                    Err(_) => solver::minimize_simplex(&objective, &bounds, &start, 1000)?,
                };

                Ok(self.snapshot(solution.x[0], solution.x[1], -solution.value, fines))
            }
            LaborSupply::Fixed { share } => {
                let labor_hours = share.clamp(0.0, 1.0) * WORK_HOURS_PER_YEAR;
                let solution = solver::minimize_scalar(
                    |s| -self.utility(labor_hours, s, fines, ctx),
                    0.0,
                    1.0,
                );
                Ok(self.snapshot(labor_hours, solution.x[0], -solution.value, fines))
            }
        }
    }

    fn snapshot(
        &self,
        labor_hours: f64,
        speeding: f64,
        utility: f64,
        fines: &FineSchedule,
    ) -> AgentState {
        let gross_income = self.wage_rate * labor_hours;
        AgentState {
            labor_hours,
            speeding,
            fine_paid: fines.calculate_fine(gross_income) * speeding,
            utility,
        }
    }

    /// Effective marginal tax rate at the agent's current gross income.
    ///
    /// Unit-income finite difference of the fine schedule, scaled by current
    /// speeding, plus the explicit tax rate.
    pub fn effective_mtr(
        &self,
        state: &AgentState,
        fines: &FineSchedule,
        tax_rate: f64,
    ) -> f64 {
        let gross_income = self.wage_rate * state.labor_hours;
        let epsilon = 1.0;
        let fine_base = fines.calculate_fine(gross_income);
        let fine_perturbed = fines.calculate_fine(gross_income + epsilon);
        let marginal_fine_rate = (fine_perturbed - fine_base) / epsilon * state.speeding;
        tax_rate + marginal_fine_rate
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PolicyContext {
        PolicyContext {
            death_prob: 0.0,
            ubi: 0.0,
            tax_rate: 0.3,
            vsl: 3_600_000.0,
        }
    }

    fn agent(income: f64) -> AgentProfile {
        AgentProfile::new(income, 1.0, 0.4, 0.08)
    }

    #[test]
    fn wage_rate_derived_from_potential_income() {
        let a = agent(52_000.0);
        assert_eq!(a.wage_rate, 25.0);
    }

    #[test]
    fn utility_is_deterministic() {
        let a = agent(50_000.0);
        let fines = FineSchedule::flat(100.0);
        let u1 = a.utility(1000.0, 0.5, &fines, &ctx());
        let u2 = a.utility(1000.0, 0.5, &fines, &ctx());
        assert_eq!(u1, u2);
    }

    #[test]
    fn utility_survives_confiscatory_fine() {
        // Fine larger than gross income drives net income to the floor
        // instead of an undefined log.
        let a = agent(10_000.0);
        let fines = FineSchedule::flat(1e9);
        let u = a.utility(100.0, 1.0, &fines, &ctx());
        assert!(u.is_finite());
    }

    #[test]
    fn decide_stays_in_box() {
        let fines = FineSchedule::flat(100.0);
        let c = ctx();
        for &income in &[5_000.0, 50_000.0, 500_000.0] {
            let state = agent(income)
                .decide(&fines, &c, LaborSupply::Endogenous)
                .expect("test: agent should converge");
            assert!(
                (0.0..=WORK_HOURS_PER_YEAR).contains(&state.labor_hours),
                "labor out of box: {}",
                state.labor_hours
            );
            assert!(
                (0.0..=1.0).contains(&state.speeding),
                "speeding out of box: {}",
                state.speeding
            );
        }
    }

    #[test]
    fn decide_stays_in_box_for_extreme_weights() {
        let fines = FineSchedule::flat(100.0);
        let c = ctx();
        // Workaholic, speed-obsessed, and indifferent agents all stay boxed.
        let extreme = [
            AgentProfile::new(60_000.0, 10.0, 0.001, 0.0),
            AgentProfile::new(60_000.0, 0.01, 5.0, 2.0),
            AgentProfile::new(60_000.0, 0.0, 0.0, 0.0),
        ];
        for a in &extreme {
            let state = a
                .decide(&fines, &c, LaborSupply::Endogenous)
                .expect("test: agent should converge");
            assert!((0.0..=WORK_HOURS_PER_YEAR).contains(&state.labor_hours));
            assert!((0.0..=1.0).contains(&state.speeding));
        }
    }

    #[test]
    fn high_death_cost_suppresses_speeding() {
        let fines = FineSchedule::flat(0.0);
        let dangerous = PolicyContext {
            death_prob: 0.01,
            ..ctx()
        };
        let state = agent(50_000.0)
            .decide(&fines, &dangerous, LaborSupply::Endogenous)
            .expect("test: agent should converge");
        // 0.01 * VSL per unit of speeding dwarfs the log pleasure term.
        assert!(state.speeding < 1e-3, "speeding = {}", state.speeding);
    }

    #[test]
    fn fixed_labor_pins_hours() {
        let fines = FineSchedule::flat(100.0);
        let state = agent(50_000.0)
            .decide(&fines, &ctx(), LaborSupply::Fixed { share: 0.5 })
            .expect("test: fixed labor always solves");
        assert_eq!(state.labor_hours, WORK_HOURS_PER_YEAR / 2.0);
        assert!((0.0..=1.0).contains(&state.speeding));
    }

    #[test]
    fn fine_paid_matches_schedule_times_speeding() {
        let fines = FineSchedule::income_based(50.0, 0.001);
        let state = agent(50_000.0)
            .decide(&fines, &ctx(), LaborSupply::Fixed { share: 1.0 })
            .expect("test: fixed labor always solves");
        let gross = 50_000.0;
        let expected = fines.calculate_fine(gross) * state.speeding;
        assert!((state.fine_paid - expected).abs() < 1e-9);
    }

    #[test]
    fn effective_mtr_combines_tax_and_fine_slope() {
        let a = agent(50_000.0);
        let state = AgentState {
            labor_hours: WORK_HOURS_PER_YEAR,
            speeding: 0.5,
            fine_paid: 0.0,
            utility: 0.0,
        };

        let flat = FineSchedule::flat(100.0);
        let mtr_flat = a.effective_mtr(&state, &flat, 0.3);
        assert!((mtr_flat - 0.3).abs() < 1e-9, "flat adds nothing: {mtr_flat}");

        let day_fine = FineSchedule::income_based(50.0, 0.002);
        let mtr_income = a.effective_mtr(&state, &day_fine, 0.3);
        assert!(
            (mtr_income - (0.3 + 0.002 * 0.5)).abs() < 1e-6,
            "income-based adds slope x speeding: {mtr_income}"
        );
    }
}
