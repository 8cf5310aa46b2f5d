// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Traffic Fine Policy Simulation Suite - Type Definitions

use serde::{Deserialize, Serialize};

// ─── SimConfig ───────────────────────────────────────────────────────────────

/// Policy and preference parameters for one simulation run.
///
/// The single canonical source of defaults — calibrated to the Finnish
/// day-fine environment (EU-recommended VSL, average marginal tax rate,
/// empirical labor and speeding elasticities).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Monetary weight on mortality risk (EUR).
    pub value_of_statistical_life: f64,
    /// Converts average speeding intensity into per-period death probability.
    pub death_prob_factor: f64,
    /// Weight on log net income in agent utility.
    pub income_utility_factor: f64,
    /// Weight on quadratic labor disutility.
    pub labor_disutility_factor: f64,
    /// Weight on log speeding pleasure.
    pub speeding_utility_factor: f64,
    /// Explicit marginal tax rate on labor income.
    pub tax_rate: f64,
    /// Hard cap on mean-field iterations.
    pub max_iterations: u32,
    /// Absolute total-utility change below which the run is converged.
    pub convergence_threshold: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            value_of_statistical_life: 3_600_000.0,
            death_prob_factor: 0.0001,
            income_utility_factor: 1.0,
            labor_disutility_factor: 0.4,
            speeding_utility_factor: 0.08,
            tax_rate: 0.4,
            max_iterations: 100,
            convergence_threshold: 0.01,
        }
    }
}

// ─── SimPhase ────────────────────────────────────────────────────────────────

/// Lifecycle of one society run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SimPhase {
    Initialized,
    Iterating,
    Converged,
    MaxIterationsReached,
}

// ─── IterationRecord ─────────────────────────────────────────────────────────

/// One row of the per-iteration history log.
///
/// `avg_speeding` and `death_prob` are the lagged aggregates the iteration
/// was solved against; `ubi` is the pool computed *from* this iteration's
/// fines and taxes (applied next iteration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub total_utility: f64,
    pub avg_speeding: f64,
    pub avg_labor: f64,
    pub ubi: f64,
    pub death_prob: f64,
    pub total_fines: f64,
    pub total_taxes: f64,
}

// ─── Group statistics ────────────────────────────────────────────────────────

/// Behavioral averages for one income quintile group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupStats {
    pub avg_labor: f64,
    pub avg_speeding: f64,
    pub avg_utility: f64,
    pub avg_fine: f64,
    pub avg_effective_mtr: f64,
    pub count: usize,
}

/// Quintile partition at the 20th/80th percentiles of potential income.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomeGroups {
    pub bottom_20: Option<GroupStats>,
    pub middle_60: Option<GroupStats>,
    pub top_20: Option<GroupStats>,
}

// ─── AgentSnapshot ───────────────────────────────────────────────────────────

/// Terminal per-agent state, exported for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub potential_income: f64,
    pub labor_hours: f64,
    pub speeding: f64,
    pub fine_paid: f64,
    pub utility: f64,
}

// ─── SimulationResults ───────────────────────────────────────────────────────

/// Results record of one converged (or capped) society run.
///
/// A failed run produces no record at all; this type never represents a
/// partial simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResults {
    pub total_utility: f64,
    pub avg_utility: f64,
    pub avg_speeding: f64,
    pub avg_labor_hours: f64,
    pub avg_labor_supply: f64,
    pub ubi: f64,
    pub death_prob: f64,
    pub iterations: u32,
    pub converged: bool,
    pub income_groups: IncomeGroups,
    pub history: Vec<IterationRecord>,
    pub agents: Vec<AgentSnapshot>,
}

// ─── WelfareMetrics ──────────────────────────────────────────────────────────

/// Distributional welfare snapshot derived from terminal agent states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelfareMetrics {
    pub total_utility: f64,
    pub avg_utility: f64,
    pub utility_gini: f64,
    pub deadweight_loss: f64,
    /// `total_utility / first_best_utility`, 0 when the denominator is
    /// non-positive.
    pub efficiency_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_calibrated_table() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.value_of_statistical_life, 3_600_000.0);
        assert_eq!(cfg.death_prob_factor, 0.0001);
        assert_eq!(cfg.tax_rate, 0.4);
        assert_eq!(cfg.max_iterations, 100);
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let cfg: SimConfig =
            serde_json::from_str(r#"{"tax_rate": 0.3, "max_iterations": 10}"#)
                .expect("test: partial config");
        assert_eq!(cfg.tax_rate, 0.3);
        assert_eq!(cfg.max_iterations, 10);
        assert_eq!(cfg.income_utility_factor, 1.0);
    }
}
