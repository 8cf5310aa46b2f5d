// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Traffic Fine Policy Simulation Suite - Society Simulation Core

use wasm_bindgen::prelude::*;

use crate::agent::{AgentProfile, AgentState, LaborSupply, PolicyContext, WORK_HOURS_PER_YEAR};
use crate::analysis;
use crate::fines::FineSchedule;
use crate::solver::SolverError;
use crate::types::*;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors that abort a society run.
///
/// A failed run yields no results record: the caller gets this error and
/// nothing else, never a partially-iterated result.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("agent {index} failed to optimize at iteration {iteration}: {source}")]
    AgentOptimization {
        index: usize,
        iteration: u32,
        #[source]
        source: SolverError,
    },

    #[error("society has no agents")]
    EmptySociety,
}

// ─── Society ─────────────────────────────────────────────────────────────────

/// A population of agents coupled only through aggregate statistics.
///
/// Each iteration every agent re-solves its labor/speeding problem against
/// the previous iteration's aggregates (average speeding → death probability,
/// pooled fines+taxes → UBI). The one-iteration lag is deliberate: the model
/// is a damped mean-field recursion, not a simultaneous fixed point.
#[wasm_bindgen]
pub struct Society {
    pub(crate) profiles: Vec<AgentProfile>,
    pub(crate) states: Vec<AgentState>,
    pub(crate) fines: FineSchedule,
    pub(crate) config: SimConfig,
    pub(crate) labor: LaborSupply,

    pub(crate) ubi: f64,
    pub(crate) death_prob: f64,
    pub(crate) total_utility: f64,
    pub(crate) phase: SimPhase,
    pub(crate) history: Vec<IterationRecord>,
}

impl Society {
    /// Build a society from potential incomes, with endogenous labor supply.
    pub fn new(incomes: &[f64], fines: FineSchedule, config: SimConfig) -> Self {
        Self::with_labor(incomes, fines, config, LaborSupply::Endogenous)
    }

    /// Build a society with an explicit labor-supply channel (the fixed
    /// variant drives the counterfactual decomposition).
    pub fn with_labor(
        incomes: &[f64],
        fines: FineSchedule,
        config: SimConfig,
        labor: LaborSupply,
    ) -> Self {
        let profiles: Vec<AgentProfile> = incomes
            .iter()
            .map(|&income| {
                AgentProfile::new(
                    income,
                    config.income_utility_factor,
                    config.labor_disutility_factor,
                    config.speeding_utility_factor,
                )
            })
            .collect();
        let states = vec![AgentState::default(); profiles.len()];

        Self {
            profiles,
            states,
            fines,
            config,
            labor,
            ubi: 0.0,
            death_prob: 0.0,
            total_utility: 0.0,
            phase: SimPhase::Initialized,
            history: Vec::new(),
        }
    }

    /// Run the mean-field iteration to convergence or the iteration cap.
    ///
    /// Any single agent failing both its solvers aborts the whole run.
    pub fn simulate(
        &mut self,
        max_iterations: u32,
    ) -> Result<SimulationResults, SimulationError> {
        let n_agents = self.profiles.len();
        if n_agents == 0 {
            return Err(SimulationError::EmptySociety);
        }

        self.phase = SimPhase::Iterating;
        let mut previous_utility = f64::NEG_INFINITY;

        for iteration in 0..max_iterations {
            // Aggregates from iteration k-1 (zero on the first pass).
            let avg_speeding =
                self.states.iter().map(|s| s.speeding).sum::<f64>() / n_agents as f64;
            self.death_prob = self.config.death_prob_factor * avg_speeding;

            let ctx = PolicyContext {
                death_prob: self.death_prob,
                ubi: self.ubi,
                tax_rate: self.config.tax_rate,
                vsl: self.config.value_of_statistical_life,
            };

            // Every agent independently re-solves against the lagged
            // aggregates; snapshots are collected before any aggregate for
            // the next iteration is computed (barrier semantics).
            let mut next_states = Vec::with_capacity(n_agents);
            for (index, profile) in self.profiles.iter().enumerate() {
                let state = profile
                    .decide(&self.fines, &ctx, self.labor)
                    .map_err(|source| SimulationError::AgentOptimization {
                        index,
                        iteration,
                        source,
                    })?;
                next_states.push(state);
            }
            self.states = next_states;

            let total_fines: f64 = self.states.iter().map(|s| s.fine_paid).sum();
            let total_taxes: f64 = self
                .profiles
                .iter()
                .zip(&self.states)
                .map(|(p, s)| p.wage_rate * s.labor_hours * self.config.tax_rate)
                .sum();

            // Redistribution pool for the NEXT iteration.
            self.ubi = (total_fines + total_taxes) / n_agents as f64;
            self.total_utility = self.states.iter().map(|s| s.utility).sum();

            let avg_labor =
                self.states.iter().map(|s| s.labor_hours).sum::<f64>() / n_agents as f64;
            self.history.push(IterationRecord {
                iteration,
                total_utility: self.total_utility,
                avg_speeding,
                avg_labor,
                ubi: self.ubi,
                death_prob: self.death_prob,
                total_fines,
                total_taxes,
            });

            if (self.total_utility - previous_utility).abs() < self.config.convergence_threshold
            {
                self.phase = SimPhase::Converged;
                break;
            }
            previous_utility = self.total_utility;
        }

        if self.phase != SimPhase::Converged {
            self.phase = SimPhase::MaxIterationsReached;
        }

        Ok(self.compile_results())
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn fines(&self) -> &FineSchedule {
        &self.fines
    }

    pub fn fines_mut(&mut self) -> &mut FineSchedule {
        &mut self.fines
    }

    // ─── Results compilation ─────────────────────────────────────────────

    fn compile_results(&self) -> SimulationResults {
        let n_agents = self.profiles.len();
        let incomes: Vec<f64> = self.profiles.iter().map(|p| p.potential_income).collect();
        let p20 = analysis::percentile(&incomes, 20.0);
        let p80 = analysis::percentile(&incomes, 80.0);

        let mut bottom = Vec::new();
        let mut middle = Vec::new();
        let mut top = Vec::new();
        for (profile, state) in self.profiles.iter().zip(&self.states) {
            let entry = (profile, state);
            if profile.potential_income <= p20 {
                bottom.push(entry);
            } else if profile.potential_income >= p80 {
                top.push(entry);
            } else {
                middle.push(entry);
            }
        }

        let avg_speeding =
            self.states.iter().map(|s| s.speeding).sum::<f64>() / n_agents as f64;
        let avg_labor_hours =
            self.states.iter().map(|s| s.labor_hours).sum::<f64>() / n_agents as f64;

        SimulationResults {
            total_utility: self.total_utility,
            avg_utility: self.total_utility / n_agents as f64,
            avg_speeding,
            avg_labor_hours,
            avg_labor_supply: avg_labor_hours / WORK_HOURS_PER_YEAR,
            ubi: self.ubi,
            death_prob: self.death_prob,
            iterations: self.history.len() as u32,
            converged: self.phase == SimPhase::Converged,
            income_groups: IncomeGroups {
                bottom_20: self.group_stats(&bottom),
                middle_60: self.group_stats(&middle),
                top_20: self.group_stats(&top),
            },
            history: self.history.clone(),
            agents: self
                .profiles
                .iter()
                .zip(&self.states)
                .map(|(p, s)| AgentSnapshot {
                    potential_income: p.potential_income,
                    labor_hours: s.labor_hours,
                    speeding: s.speeding,
                    fine_paid: s.fine_paid,
                    utility: s.utility,
                })
                .collect(),
        }
    }

    fn group_stats(&self, members: &[(&AgentProfile, &AgentState)]) -> Option<GroupStats> {
        if members.is_empty() {
            return None;
        }
        let n = members.len() as f64;
        let mut stats = GroupStats {
            avg_labor: 0.0,
            avg_speeding: 0.0,
            avg_utility: 0.0,
            avg_fine: 0.0,
            avg_effective_mtr: 0.0,
            count: members.len(),
        };
        for &(profile, state) in members {
            stats.avg_labor += state.labor_hours / n;
            stats.avg_speeding += state.speeding / n;
            stats.avg_utility += state.utility / n;
            stats.avg_fine += state.fine_paid / n;
            stats.avg_effective_mtr +=
                profile.effective_mtr(state, &self.fines, self.config.tax_rate) / n;
        }
        Some(stats)
    }

    // ─── Welfare metrics ─────────────────────────────────────────────────

    /// Distributional metrics over the terminal agent states.
    ///
    /// Deadweight loss benchmarks against each agent's first-best: the
    /// labor-only optimum with zero speeding and zero fines, taxed at the
    /// statutory rate and receiving the current UBI.
    pub fn welfare_metrics(&self) -> WelfareMetrics {
        let n_agents = self.profiles.len().max(1);
        let utilities: Vec<f64> = self.states.iter().map(|s| s.utility).collect();
        let utility_gini = analysis::gini(&utilities);

        let mut first_best_utility = 0.0;
        for profile in &self.profiles {
            let solution = crate::solver::minimize_scalar(
                |hours| {
                    let gross = profile.wage_rate * hours;
                    let net = gross * (1.0 - self.config.tax_rate) + self.ubi;
                    let labor_disutility = profile.labor_disutility_factor * hours * hours
                        / (2.0 * WORK_HOURS_PER_YEAR);
                    -(profile.income_utility_factor * (1.0 + net).ln() - labor_disutility)
                },
                0.0,
                WORK_HOURS_PER_YEAR,
            );
            first_best_utility += -solution.value;
        }

        WelfareMetrics {
            total_utility: self.total_utility,
            avg_utility: self.total_utility / n_agents as f64,
            utility_gini,
            deadweight_loss: first_best_utility - self.total_utility,
            efficiency_ratio: if first_best_utility > 0.0 {
                self.total_utility / first_best_utility
            } else {
                0.0
            },
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> SimConfig {
        SimConfig {
            tax_rate: 0.3,
            labor_disutility_factor: 0.3,
            convergence_threshold: 1.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn converges_on_small_society() {
        let mut society = Society::new(
            &[40_000.0, 50_000.0, 60_000.0],
            FineSchedule::flat(50.0),
            quick_config(),
        );
        let results = society.simulate(20).expect("test: simulation should run");
        assert!(results.converged, "should converge with a loose threshold");
        assert!(results.iterations < 20, "iterations = {}", results.iterations);
        assert_eq!(society.phase(), SimPhase::Converged);
    }

    #[test]
    fn history_length_matches_iteration_count() {
        let mut society = Society::new(
            &[30_000.0, 60_000.0, 90_000.0],
            FineSchedule::flat(100.0),
            quick_config(),
        );
        let results = society.simulate(5).expect("test: simulation should run");
        assert_eq!(results.history.len(), results.iterations as usize);
    }

    #[test]
    fn ubi_matches_pool_from_last_record() {
        let mut society = Society::new(
            &[30_000.0, 60_000.0, 90_000.0],
            FineSchedule::flat(100.0),
            quick_config(),
        );
        let results = society.simulate(5).expect("test: simulation should run");
        let last = results.history.last().expect("test: nonempty history");
        let expected = (last.total_fines + last.total_taxes) / 3.0;
        assert!(
            (results.ubi - expected).abs() < 1e-9,
            "ubi {} vs pooled {}",
            results.ubi,
            expected
        );
        assert!((last.ubi - expected).abs() < 1e-9);
    }

    #[test]
    fn first_iteration_uses_zero_lagged_aggregates() {
        let mut society = Society::new(
            &[30_000.0, 60_000.0],
            FineSchedule::flat(100.0),
            quick_config(),
        );
        let results = society.simulate(2).expect("test: simulation should run");
        let first = &results.history[0];
        // Iteration 0 was solved against zero speeding history and no pool;
        // the record's ubi is the pool it produced for iteration 1.
        assert_eq!(first.avg_speeding, 0.0);
        assert_eq!(first.death_prob, 0.0);
        assert!(first.ubi > 0.0, "taxes alone should fund a positive pool");
    }

    #[test]
    fn quintile_partition_separates_extremes() {
        let mut society = Society::new(
            &[20_000.0, 40_000.0, 60_000.0, 80_000.0, 100_000.0],
            FineSchedule::flat(100.0),
            quick_config(),
        );
        let results = society.simulate(3).expect("test: simulation should run");
        let groups = &results.income_groups;
        let bottom = groups.bottom_20.as_ref().expect("test: bottom group");
        let top = groups.top_20.as_ref().expect("test: top group");
        let middle = groups.middle_60.as_ref().expect("test: middle group");
        assert_eq!(bottom.count, 1);
        assert_eq!(top.count, 1);
        assert_eq!(middle.count, 3);
    }

    #[test]
    fn empty_society_is_an_error() {
        let mut society =
            Society::new(&[], FineSchedule::flat(100.0), SimConfig::default());
        assert!(matches!(
            society.simulate(5),
            Err(SimulationError::EmptySociety)
        ));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut society = Society::new(
            &[30_000.0, 60_000.0],
            FineSchedule::flat(100.0),
            quick_config(),
        );
        society.simulate(3).expect("test: simulation should run");
        assert!(!society.history.is_empty());

        society.reset();
        assert_eq!(society.phase(), SimPhase::Initialized);
        assert_eq!(society.ubi, 0.0);
        assert!(society.history.is_empty());
        assert_eq!(society.states[0].labor_hours, 0.0);
    }

    #[test]
    fn welfare_metrics_are_consistent() {
        let mut society = Society::new(
            &[30_000.0, 60_000.0, 90_000.0],
            FineSchedule::flat(100.0),
            quick_config(),
        );
        society.simulate(5).expect("test: simulation should run");
        let metrics = society.welfare_metrics();

        assert!((0.0..=1.0).contains(&metrics.utility_gini.abs()));
        // First-best ignores the speeding externality, so realized welfare
        // cannot exceed it by more than the speeding pleasure term.
        assert!(metrics.deadweight_loss.is_finite());
        assert!(metrics.efficiency_ratio.is_finite());
        assert_eq!(metrics.total_utility, society.total_utility);
    }

    #[test]
    fn fixed_labor_society_pins_hours() {
        let mut society = Society::with_labor(
            &[30_000.0, 60_000.0],
            FineSchedule::flat(100.0),
            quick_config(),
            LaborSupply::Fixed { share: 0.5 },
        );
        let results = society.simulate(3).expect("test: simulation should run");
        for agent in &results.agents {
            assert_eq!(agent.labor_hours, WORK_HOURS_PER_YEAR / 2.0);
        }
    }
}
