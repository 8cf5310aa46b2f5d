// Benchmark Report Types — structured output for independent analysis
// One JSON report per suite run, one JSONL stream per run when enabled

use fines_engine::analysis::Stats;
use serde::Serialize;

// ─── Single-Run Result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub scenario: String,
    pub name: String,
    pub category: String,
    pub seed: u64,
    pub pass: bool,
    pub elapsed_ms: u128,

    pub flat_utility: f64,
    pub income_utility: f64,
    pub welfare_difference: f64,
    pub welfare_pct_change: f64,

    pub flat_converged: bool,
    pub income_converged: bool,
    pub flat_iterations: u32,
    pub income_iterations: u32,

    pub flat_gini: f64,
    pub income_gini: f64,
    pub flat_efficiency: f64,
    pub income_efficiency: f64,

    pub flat_avg_speeding: f64,
    pub income_avg_speeding: f64,
    pub top_mtr_flat: f64,
    pub top_mtr_income: f64,
    pub mtr_ordering_holds: bool,

    // Decomposition scenarios only.
    pub total_effect: Option<f64>,
    pub pure_deterrence: Option<f64>,
    pub labor_distortion: Option<f64>,

    // Optimization scenarios only.
    pub flat_optimum: Option<Vec<f64>>,
    pub income_optimum: Option<Vec<f64>>,
    pub evaluations: Option<usize>,
    pub penalty_evaluations: Option<usize>,
}

// ─── Monte Carlo Report (per-scenario aggregation) ──────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloReport {
    pub scenario_name: String,
    pub label: String,
    pub category: String,
    pub n_runs: usize,
    pub pass_rate: f64,
    pub flat_utility: Stats,
    pub income_utility: Stats,
    pub welfare_difference: Stats,
    pub welfare_pct_change: Stats,
    pub flat_gini: Stats,
    pub income_gini: Stats,
    pub elapsed_ms: Stats,
    pub individual_runs: Vec<BenchResult>,
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub n_runs_per_scenario: usize,
    pub summary: Summary,
    pub scenarios: Vec<MonteCarloReport>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
}
