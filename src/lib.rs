// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Traffic Fine Policy Simulation Suite

pub mod types;
pub mod fines;
pub mod solver;
pub mod agent;
pub mod society;
pub mod optimizer;
pub mod counterfactual;
pub mod analysis;

#[cfg(not(target_arch = "wasm32"))]
pub mod income;

pub use agent::{AgentProfile, AgentState, LaborSupply, WORK_HOURS_PER_YEAR};
pub use fines::{FineError, FineSchedule};
pub use society::{SimulationError, Society};
pub use types::*;

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

// ─── WASM Interface ──────────────────────────────────────────────────────────

// The dashboard talks to the engine through this surface: construct a
// society from sampled incomes and slider values, run it, and read back
// serialized result records for plotting.

#[wasm_bindgen]
impl Society {
    /// Build a society from potential incomes, a fine schedule kind
    /// (`"flat"`, `"income_based"`, `"progressive"`) with its parameter
    /// vector, and an optional config object.
    #[wasm_bindgen(constructor)]
    pub fn create(
        incomes: Vec<f64>,
        fine_kind: String,
        fine_params: Vec<f64>,
        config: JsValue,
    ) -> Result<Society, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let config: SimConfig = if config.is_undefined() || config.is_null() {
            SimConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        let fines = FineSchedule::from_kind(&fine_kind, &fine_params)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Society::new(&incomes, fines, config))
    }

    /// Run to convergence or the iteration cap and return the results
    /// record. A failed run returns `null` — there is no partial record.
    pub fn run(&mut self, max_iterations: u32) -> JsValue {
        match self.simulate(max_iterations) {
            Ok(results) => serde_wasm_bindgen::to_value(&results).unwrap_or(JsValue::NULL),
            Err(_e) => {
                #[cfg(target_arch = "wasm32")]
                log(&format!("simulation failed: {_e}"));
                JsValue::NULL
            }
        }
    }

    /// Distributional welfare metrics over the terminal agent states.
    pub fn metrics(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.welfare_metrics()).unwrap_or(JsValue::NULL)
    }

    /// Per-iteration history log of the last run.
    pub fn history(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.history).unwrap_or(JsValue::NULL)
    }

    /// Terminal per-agent states of the last run.
    pub fn agent_states(&self) -> JsValue {
        let snapshots: Vec<AgentSnapshot> = self
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
            .collect();
        serde_wasm_bindgen::to_value(&snapshots).unwrap_or(JsValue::NULL)
    }

    pub fn set_tax_rate(&mut self, tax_rate: f64) {
        self.config.tax_rate = tax_rate;
    }

    /// Replace the fine parameter vector between runs. Fails hard on an
    /// arity mismatch.
    pub fn set_fine_parameters(&mut self, params: Vec<f64>) -> Result<(), JsValue> {
        self.fines
            .set_parameters(&params)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn fine_parameters(&self) -> Vec<f64> {
        self.fines.parameters()
    }

    pub fn ubi(&self) -> f64 {
        self.ubi
    }

    pub fn death_prob(&self) -> f64 {
        self.death_prob
    }

    pub fn total_utility(&self) -> f64 {
        self.total_utility
    }

    pub fn iteration_count(&self) -> u32 {
        self.history.len() as u32
    }

    /// Reset to the pre-simulation state (keeps agents and parameters).
    pub fn reset(&mut self) {
        self.states = vec![AgentState::default(); self.profiles.len()];
        self.ubi = 0.0;
        self.death_prob = 0.0;
        self.total_utility = 0.0;
        self.phase = SimPhase::Initialized;
        self.history.clear();
    }
}
