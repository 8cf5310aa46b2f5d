// Monte Carlo Infrastructure — N runs per scenario with statistical aggregation
// Each scenario runs with seeds base..base+N-1, computing mean ± 95% CI

use fines_engine::analysis::{self, Stats};
use fines_engine::counterfactual::decompose_labor_response;
use fines_engine::income::IncomeSampler;
use fines_engine::optimizer::compare_fine_structures;
use fines_engine::{
    FineSchedule, SimulationResults, Society, WORK_HOURS_PER_YEAR,
};

use crate::report::{BenchResult, MonteCarloReport};
use crate::scenarios::{Scenario, ScenarioKind};
use crate::time_series::HistoryRecorder;

use std::time::Instant;

/// Behavioral invariants every successful run must satisfy regardless of
/// scenario criteria.
fn invariants_hold(results: &SimulationResults) -> bool {
    results.history.len() == results.iterations as usize
        && results.total_utility.is_finite()
        && results.agents.iter().all(|a| {
            (0.0..=1.0).contains(&a.speeding)
                && (0.0..=WORK_HOURS_PER_YEAR).contains(&a.labor_hours)
        })
}

fn top_quintile_mtr(results: &SimulationResults) -> (f64, f64) {
    match &results.income_groups.top_20 {
        Some(top) => (top.avg_effective_mtr, top.avg_speeding),
        None => (0.0, 0.0),
    }
}

/// Run a single scenario iteration with a specific seed.
pub fn run_single(
    scenario: &Scenario,
    seed: u64,
    history_dir: Option<&std::path::Path>,
) -> BenchResult {
    let start = Instant::now();

    let mut result = BenchResult {
        scenario: scenario.label.to_string(),
        name: scenario.name.to_string(),
        category: scenario.category.to_string(),
        seed,
        pass: false,
        elapsed_ms: 0,
        flat_utility: 0.0,
        income_utility: 0.0,
        welfare_difference: 0.0,
        welfare_pct_change: 0.0,
        flat_converged: false,
        income_converged: false,
        flat_iterations: 0,
        income_iterations: 0,
        flat_gini: 0.0,
        income_gini: 0.0,
        flat_efficiency: 0.0,
        income_efficiency: 0.0,
        flat_avg_speeding: 0.0,
        income_avg_speeding: 0.0,
        top_mtr_flat: 0.0,
        top_mtr_income: 0.0,
        mtr_ordering_holds: true,
        total_effect: None,
        pure_deterrence: None,
        labor_distortion: None,
        flat_optimum: None,
        income_optimum: None,
        evaluations: None,
        penalty_evaluations: None,
    };

    let incomes = match IncomeSampler::new(scenario.income.clone(), seed)
        .sample(scenario.n_agents)
    {
        Ok(incomes) => incomes,
        Err(e) => {
            eprintln!("  {}: income sampling failed: {e}", scenario.name);
            result.elapsed_ms = start.elapsed().as_millis();
            return result;
        }
    };

    let mut ok = true;
    match &scenario.kind {
        ScenarioKind::Comparison {
            flat_params,
            income_params,
        } => {
            let flat = FineSchedule::flat(flat_params[0]);
            let day_fine = FineSchedule::income_based(income_params[0], income_params[1]);

            let mut flat_society =
                Society::new(&incomes, flat, scenario.config.clone());
            let mut income_society =
                Society::new(&incomes, day_fine, scenario.config.clone());

            let flat_run = flat_society.simulate(scenario.config.max_iterations);
            let income_run = income_society.simulate(scenario.config.max_iterations);

            match (flat_run, income_run) {
                (Ok(flat_results), Ok(income_results)) => {
                    ok &= invariants_hold(&flat_results) && invariants_hold(&income_results);

                    let flat_metrics = flat_society.welfare_metrics();
                    let income_metrics = income_society.welfare_metrics();

                    result.flat_utility = flat_results.total_utility;
                    result.income_utility = income_results.total_utility;
                    result.welfare_difference =
                        income_results.total_utility - flat_results.total_utility;
                    result.welfare_pct_change = if flat_results.total_utility.abs()
                        > f64::EPSILON
                    {
                        result.welfare_difference / flat_results.total_utility * 100.0
                    } else {
                        0.0
                    };
                    result.flat_converged = flat_results.converged;
                    result.income_converged = income_results.converged;
                    result.flat_iterations = flat_results.iterations;
                    result.income_iterations = income_results.iterations;
                    result.flat_gini = flat_metrics.utility_gini;
                    result.income_gini = income_metrics.utility_gini;
                    result.flat_efficiency = flat_metrics.efficiency_ratio;
                    result.income_efficiency = income_metrics.efficiency_ratio;
                    result.flat_avg_speeding = flat_results.avg_speeding;
                    result.income_avg_speeding = income_results.avg_speeding;

                    let (mtr_flat, _) = top_quintile_mtr(&flat_results);
                    let (mtr_income, top_speeding) = top_quintile_mtr(&income_results);
                    result.top_mtr_flat = mtr_flat;
                    result.top_mtr_income = mtr_income;
                    result.mtr_ordering_holds =
                        top_speeding <= 0.01 || mtr_income >= mtr_flat - 1e-9;

                    if let Some(dir) = history_dir {
                        let flat_path = dir.join(format!("seed-{seed}-flat.jsonl"));
                        let income_path = dir.join(format!("seed-{seed}-income.jsonl"));
                        if let Err(e) = HistoryRecorder::from_history(&flat_results.history)
                            .write_jsonl(&flat_path)
                            .and_then(|_| {
                                HistoryRecorder::from_history(&income_results.history)
                                    .write_jsonl(&income_path)
                            })
                        {
                            eprintln!("  Warning: failed to write history: {e}");
                        }
                    }

                    if scenario.criteria.require_convergence {
                        ok &= flat_results.converged && income_results.converged;
                    }
                    if let Some(max_gini) = scenario.criteria.max_gini {
                        ok &= result.flat_gini.abs() <= max_gini
                            && result.income_gini.abs() <= max_gini;
                    }
                    if scenario.criteria.require_mtr_ordering {
                        ok &= result.mtr_ordering_holds;
                    }
                }
                _ => ok = false,
            }
        }

        ScenarioKind::Optimize { budget } => {
            let comparison = compare_fine_structures(
                &incomes,
                &scenario.config,
                scenario.config.tax_rate,
                *budget,
            );

            result.flat_utility = comparison.flat.utility;
            result.income_utility = comparison.income_based.utility;
            result.welfare_difference = comparison.welfare_difference;
            result.welfare_pct_change = comparison.welfare_pct_change;
            result.flat_optimum = Some(comparison.flat.params.clone());
            result.income_optimum = Some(comparison.income_based.params.clone());

            let evaluations =
                comparison.flat.trace.len() + comparison.income_based.trace.len();
            let penalties = comparison
                .flat
                .trace
                .iter()
                .chain(&comparison.income_based.trace)
                .filter(|e| e.is_penalty())
                .count();
            result.evaluations = Some(evaluations);
            result.penalty_evaluations = Some(penalties);

            // Ginis over the best-seen runs' terminal utilities.
            for (outcome, gini_slot, conv_slot, iter_slot) in [
                (
                    &comparison.flat,
                    &mut result.flat_gini,
                    &mut result.flat_converged,
                    &mut result.flat_iterations,
                ),
                (
                    &comparison.income_based,
                    &mut result.income_gini,
                    &mut result.income_converged,
                    &mut result.income_iterations,
                ),
            ] {
                if let Some(best) = outcome
                    .trace
                    .iter()
                    .filter(|e| !e.is_penalty())
                    .max_by(|a, b| a.utility.total_cmp(&b.utility))
                {
                    if let Some(results) = &best.results {
                        let utilities: Vec<f64> =
                            results.agents.iter().map(|a| a.utility).collect();
                        *gini_slot = analysis::gini(&utilities);
                        *conv_slot = results.converged;
                        *iter_slot = results.iterations;
                        ok &= invariants_hold(results);
                    }
                }
            }

            ok &= evaluations > 0 && result.welfare_difference.is_finite();
        }

        ScenarioKind::Decomposition {
            flat_params,
            income_params,
            fixed_labor_share,
        } => {
            let flat = FineSchedule::flat(flat_params[0]);
            let day_fine = FineSchedule::income_based(income_params[0], income_params[1]);

            match decompose_labor_response(
                &incomes,
                &flat,
                &day_fine,
                &scenario.config,
                *fixed_labor_share,
            ) {
                Ok(d) => {
                    result.flat_utility = d.flat_endogenous.total_utility;
                    result.income_utility = d.income_endogenous.total_utility;
                    result.welfare_difference = d.total_effect;
                    result.flat_converged = d.flat_endogenous.converged;
                    result.income_converged = d.income_endogenous.converged;
                    result.flat_iterations = d.flat_endogenous.iterations;
                    result.income_iterations = d.income_endogenous.iterations;
                    result.total_effect = Some(d.total_effect);
                    result.pure_deterrence = Some(d.pure_deterrence);
                    result.labor_distortion = Some(d.labor_distortion);

                    ok &= invariants_hold(&d.flat_endogenous)
                        && invariants_hold(&d.income_endogenous)
                        && invariants_hold(&d.flat_fixed)
                        && invariants_hold(&d.income_fixed);
                    // Decomposition identity is exact arithmetic.
                    ok &= (d.labor_distortion - (d.total_effect - d.pure_deterrence)).abs()
                        < 1e-9;
                }
                Err(e) => {
                    eprintln!("  {}: decomposition failed: {e}", scenario.name);
                    ok = false;
                }
            }
        }
    }

    result.pass = ok;
    result.elapsed_ms = start.elapsed().as_millis();
    result
}

/// Run Monte Carlo: N seeded runs of a scenario, aggregate stats.
pub fn run_monte_carlo(
    scenario: &Scenario,
    n_runs: usize,
    base_seed: u64,
    history_base: Option<&std::path::Path>,
) -> MonteCarloReport {
    let history_dir = history_base.map(|base| base.join(scenario.name.to_lowercase()));

    let mut results = Vec::with_capacity(n_runs);
    for i in 0..n_runs {
        let seed = base_seed + i as u64;
        results.push(run_single(scenario, seed, history_dir.as_deref()));
    }

    aggregate(scenario, results)
}

fn aggregate(scenario: &Scenario, results: Vec<BenchResult>) -> MonteCarloReport {
    let n = results.len();
    let passed = results.iter().filter(|r| r.pass).count();

    let stats_of = |f: &dyn Fn(&BenchResult) -> f64| {
        Stats::from_samples(&results.iter().map(f).collect::<Vec<_>>())
    };

    MonteCarloReport {
        scenario_name: scenario.name.to_string(),
        label: scenario.label.to_string(),
        category: scenario.category.to_string(),
        n_runs: n,
        pass_rate: if n > 0 { passed as f64 / n as f64 } else { 0.0 },
        flat_utility: stats_of(&|r| r.flat_utility),
        income_utility: stats_of(&|r| r.income_utility),
        welfare_difference: stats_of(&|r| r.welfare_difference),
        welfare_pct_change: stats_of(&|r| r.welfare_pct_change),
        flat_gini: stats_of(&|r| r.flat_gini),
        income_gini: stats_of(&|r| r.income_gini),
        elapsed_ms: stats_of(&|r| r.elapsed_ms as f64),
        individual_runs: results,
    }
}
