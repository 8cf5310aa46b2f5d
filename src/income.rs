// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Traffic Fine Policy Simulation Suite - Income Distribution Sampler

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, Normal, Pareto};
use serde::{Deserialize, Serialize};

/// Pareto shape used when sampling heavy-tailed incomes (higher = less
/// inequality).
const PARETO_ALPHA: f64 = 2.0;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum IncomeError {
    #[error("income distribution needs positive mean and spread (mean={mean}, sd={sd})")]
    InvalidMoments { mean: f64, sd: f64 },
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncomeDistribution {
    LogNormal,
    Normal,
    Pareto,
    Uniform,
}

/// Shape of the sampled income population.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeConfig {
    pub mean: f64,
    pub sd: f64,
    pub distribution: IncomeDistribution,
    /// Truncation floor — keeps every draw a positive magnitude.
    pub min: f64,
    /// Truncation ceiling.
    pub max: f64,
}

impl Default for IncomeConfig {
    fn default() -> Self {
        Self {
            mean: 60_000.0,
            sd: 30_000.0,
            distribution: IncomeDistribution::LogNormal,
            min: 10_000.0,
            max: 1_000_000.0,
        }
    }
}

// ─── IncomeSampler ───────────────────────────────────────────────────────────

/// Seedable income generator for benchmark and experiment runs.
pub struct IncomeSampler {
    rng: ChaCha8Rng,
    config: IncomeConfig,
}

impl IncomeSampler {
    pub fn new(config: IncomeConfig, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        }
    }

    /// Draw `n` incomes, truncated to the configured bounds.
    pub fn sample(&mut self, n: usize) -> Result<Vec<f64>, IncomeError> {
        let IncomeConfig { mean, sd, .. } = self.config;
        if mean <= 0.0 || sd <= 0.0 {
            return Err(IncomeError::InvalidMoments { mean, sd });
        }

        let mut incomes = Vec::with_capacity(n);
        match self.config.distribution {
            IncomeDistribution::LogNormal => {
                // Moment-match mu/sigma to the requested mean and sd.
                let cv = sd / mean;
                let sigma = (1.0 + cv * cv).ln().sqrt();
                let mu = mean.ln() - sigma * sigma / 2.0;
                let dist = LogNormal::new(mu, sigma)
                    .map_err(|_| IncomeError::InvalidMoments { mean, sd })?;
                for _ in 0..n {
                    incomes.push(dist.sample(&mut self.rng));
                }
            }
            IncomeDistribution::Normal => {
                let dist = Normal::new(mean, sd)
                    .map_err(|_| IncomeError::InvalidMoments { mean, sd })?;
                for _ in 0..n {
                    incomes.push(dist.sample(&mut self.rng));
                }
            }
            IncomeDistribution::Pareto => {
                let scale = mean * (PARETO_ALPHA - 1.0) / PARETO_ALPHA;
                let dist = Pareto::new(scale, PARETO_ALPHA)
                    .map_err(|_| IncomeError::InvalidMoments { mean, sd })?;
                for _ in 0..n {
                    incomes.push(dist.sample(&mut self.rng));
                }
            }
            IncomeDistribution::Uniform => {
                // Width chosen so the uniform matches the requested sd.
                let width = sd * 12.0_f64.sqrt();
                let low = mean - width / 2.0;
                let high = mean + width / 2.0;
                for _ in 0..n {
                    incomes.push(self.rng.gen_range(low..high));
                }
            }
        }

        for income in incomes.iter_mut() {
            *income = income.clamp(self.config.min, self.config.max);
        }
        Ok(incomes)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_respect_truncation_bounds() {
        for distribution in [
            IncomeDistribution::LogNormal,
            IncomeDistribution::Normal,
            IncomeDistribution::Pareto,
            IncomeDistribution::Uniform,
        ] {
            let config = IncomeConfig {
                distribution,
                ..IncomeConfig::default()
            };
            let mut sampler = IncomeSampler::new(config, 7);
            let incomes = sampler.sample(2000).expect("test: valid moments");
            assert_eq!(incomes.len(), 2000);
            assert!(incomes.iter().all(|&i| (10_000.0..=1_000_000.0).contains(&i)));
        }
    }

    #[test]
    fn lognormal_mean_matches_target() {
        let mut sampler = IncomeSampler::new(IncomeConfig::default(), 42);
        let incomes = sampler.sample(10_000).expect("test: valid moments");
        let mean = incomes.iter().sum::<f64>() / incomes.len() as f64;
        // Truncation pulls the tails in; a wide tolerance is enough to catch
        // a broken moment match.
        assert!(
            (mean - 60_000.0).abs() < 6_000.0,
            "sample mean {mean} far from 60000"
        );
    }

    #[test]
    fn seeded_draws_reproduce() {
        let a = IncomeSampler::new(IncomeConfig::default(), 99)
            .sample(100)
            .expect("test: valid moments");
        let b = IncomeSampler::new(IncomeConfig::default(), 99)
            .sample(100)
            .expect("test: valid moments");
        assert_eq!(a, b);
        let c = IncomeSampler::new(IncomeConfig::default(), 100)
            .sample(100)
            .expect("test: valid moments");
        assert_ne!(a, c);
    }

    #[test]
    fn invalid_moments_rejected() {
        let config = IncomeConfig {
            mean: -1.0,
            ..IncomeConfig::default()
        };
        let err = IncomeSampler::new(config, 0).sample(10);
        assert!(matches!(err, Err(IncomeError::InvalidMoments { .. })));
    }
}
