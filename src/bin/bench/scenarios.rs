// Scenario Definitions — policy experiments over sampled income populations
// All scenario logic lives in this table; the runner stays generic

use fines_engine::income::{IncomeConfig, IncomeDistribution};
use fines_engine::SimConfig;

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub n_agents: usize,
    pub income: IncomeConfig,
    pub config: SimConfig,
    pub kind: ScenarioKind,
    pub criteria: PassCriteria,
}

pub enum ScenarioKind {
    /// Fixed-parameter flat vs. income-based comparison.
    Comparison {
        flat_params: Vec<f64>,
        income_params: Vec<f64>,
    },
    /// Full welfare optimization of both structures (small budget).
    Optimize { budget: u32 },
    /// Four-way labor-response decomposition.
    Decomposition {
        flat_params: Vec<f64>,
        income_params: Vec<f64>,
        fixed_labor_share: f64,
    },
}

pub struct PassCriteria {
    /// Require both runs to reach the convergence threshold.
    pub require_convergence: bool,
    /// Upper bound on the utility Gini of either run.
    pub max_gini: Option<f64>,
    /// Require the day-fine effective MTR ordering in the top quintile.
    pub require_mtr_ordering: bool,
}

impl Default for PassCriteria {
    fn default() -> Self {
        Self {
            require_convergence: false,
            max_gini: None,
            require_mtr_ordering: true,
        }
    }
}

// ─── Income profiles ────────────────────────────────────────────────────────

fn finnish_incomes() -> IncomeConfig {
    IncomeConfig {
        mean: 42_000.0,
        sd: 18_000.0,
        distribution: IncomeDistribution::LogNormal,
        min: 10_000.0,
        max: 1_000_000.0,
    }
}

fn us_style_incomes() -> IncomeConfig {
    IncomeConfig {
        mean: 60_000.0,
        sd: 30_000.0,
        distribution: IncomeDistribution::LogNormal,
        min: 10_000.0,
        max: 1_000_000.0,
    }
}

// Convergence is checked on total utility, so the threshold scales with
// population size.
fn loose_threshold(n_agents: usize) -> f64 {
    0.1 * n_agents as f64
}

// ─── Scenario Table ─────────────────────────────────────────────────────────

pub fn scenarios(n_agents_override: Option<usize>) -> Vec<Scenario> {
    let n = |default: usize| n_agents_override.unwrap_or(default);

    vec![
        Scenario {
            name: "FI_BASELINE_DAYFINE",
            label: "Finland: flat 200 vs day-fine",
            category: "comparison",
            n_agents: n(150),
            income: finnish_incomes(),
            config: SimConfig {
                max_iterations: 30,
                convergence_threshold: loose_threshold(n(150)),
                ..SimConfig::default()
            },
            kind: ScenarioKind::Comparison {
                flat_params: vec![200.0],
                income_params: vec![200.0, 0.0167],
            },
            criteria: PassCriteria {
                require_convergence: true,
                max_gini: Some(1.0),
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "US_FLAT_100",
            label: "US-style: flat 100 vs mild day-fine",
            category: "comparison",
            n_agents: n(150),
            income: us_style_incomes(),
            config: SimConfig {
                tax_rate: 0.3,
                max_iterations: 30,
                convergence_threshold: loose_threshold(n(150)),
                ..SimConfig::default()
            },
            kind: ScenarioKind::Comparison {
                flat_params: vec![100.0],
                income_params: vec![50.0, 0.001],
            },
            criteria: PassCriteria {
                require_convergence: true,
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "HIGH_VSL",
            label: "High VSL (10M): deterrence dominates",
            category: "sensitivity",
            n_agents: n(100),
            income: finnish_incomes(),
            config: SimConfig {
                value_of_statistical_life: 10_000_000.0,
                max_iterations: 30,
                convergence_threshold: loose_threshold(n(100)),
                ..SimConfig::default()
            },
            kind: ScenarioKind::Comparison {
                flat_params: vec![200.0],
                income_params: vec![200.0, 0.0167],
            },
            criteria: PassCriteria::default(),
        },
        Scenario {
            name: "PARETO_TAIL",
            label: "Pareto incomes: heavy top tail",
            category: "sensitivity",
            n_agents: n(100),
            income: IncomeConfig {
                distribution: IncomeDistribution::Pareto,
                ..us_style_incomes()
            },
            config: SimConfig {
                tax_rate: 0.3,
                max_iterations: 30,
                convergence_threshold: loose_threshold(n(100)),
                ..SimConfig::default()
            },
            kind: ScenarioKind::Comparison {
                flat_params: vec![100.0],
                income_params: vec![50.0, 0.001],
            },
            criteria: PassCriteria::default(),
        },
        Scenario {
            name: "LABOR_DECOMPOSITION",
            label: "Deterrence vs labor distortion",
            category: "decomposition",
            n_agents: n(60),
            income: finnish_incomes(),
            config: SimConfig {
                max_iterations: 20,
                convergence_threshold: loose_threshold(n(60)),
                ..SimConfig::default()
            },
            kind: ScenarioKind::Decomposition {
                flat_params: vec![200.0],
                income_params: vec![200.0, 0.0167],
                fixed_labor_share: 0.5,
            },
            criteria: PassCriteria {
                require_mtr_ordering: false,
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "OPTIMIZE_SMALL",
            label: "Welfare optimization (small pop)",
            category: "optimization",
            n_agents: n(20),
            income: finnish_incomes(),
            config: SimConfig {
                max_iterations: 15,
                convergence_threshold: loose_threshold(n(20)),
                ..SimConfig::default()
            },
            kind: ScenarioKind::Optimize { budget: 25 },
            criteria: PassCriteria {
                require_mtr_ordering: false,
                ..PassCriteria::default()
            },
        },
    ]
}
