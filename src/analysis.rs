// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Traffic Fine Policy Simulation Suite - Distributional Statistics

use serde::{Deserialize, Serialize};

// ─── Gini coefficient ────────────────────────────────────────────────────────

/// Rank-weighted Gini coefficient (0 = perfect equality).
///
/// `G = 2·Σᵢ (i+1)·xᵢ / (n·Σ xᵢ) − (n+1)/n` over ascending-sorted values.
/// Degenerate distributions (empty, or zero total) report 0.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let total: f64 = sorted.iter().sum();
    if total.abs() < f64::EPSILON {
        return 0.0;
    }

    let rank_weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 + 1.0) * v)
        .sum();

    (2.0 * rank_weighted) / (n as f64 * total) - (n as f64 + 1.0) / n as f64
}

// ─── Lorenz curve ────────────────────────────────────────────────────────────

/// Lorenz curve coordinates: cumulative population share vs. cumulative
/// value share, sampled at `n_points` evenly spaced abscissae.
pub fn lorenz_curve(values: &[f64], n_points: usize) -> (Vec<f64>, Vec<f64>) {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut cumsum = Vec::with_capacity(sorted.len());
    let mut acc = 0.0;
    for &v in &sorted {
        acc += v;
        cumsum.push(acc);
    }
    let total = acc;

    let mut xs = Vec::with_capacity(n_points);
    let mut ys = Vec::with_capacity(n_points);
    for i in 0..n_points {
        let x = if n_points > 1 {
            i as f64 / (n_points - 1) as f64
        } else {
            0.0
        };
        let idx = (x * sorted.len() as f64) as usize;
        let y = if idx == 0 || total.abs() < f64::EPSILON {
            0.0
        } else {
            cumsum[idx - 1] / total
        };
        xs.push(x);
        ys.push(y);
    }
    (xs, ys)
}

// ─── Percentile ──────────────────────────────────────────────────────────────

/// Linear-interpolation percentile of an unsorted slice, `q` in 0..=100.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] + frac * (sorted[upper] - sorted[lower])
    }
}

// ─── Sample statistics ───────────────────────────────────────────────────────

/// Per-metric aggregation over Monte Carlo runs: mean ± 95% CI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                ci_lower: 0.0,
                ci_upper: 0.0,
                min: 0.0,
                max: 0.0,
                n: 0,
            };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gini_zero_for_equal_values() {
        let g = gini(&[5.0, 5.0, 5.0, 5.0]);
        assert!(g.abs() < 1e-12, "equal distribution should be 0, got {g}");
    }

    #[test]
    fn gini_approaches_one_for_single_holder() {
        // One agent holds everything: G = (n-1)/n exactly.
        let n = 10;
        let mut values = vec![0.0; n];
        values[0] = 1000.0;
        let g = gini(&values);
        let expected = (n as f64 - 1.0) / n as f64;
        assert!((g - expected).abs() < 1e-12, "got {g}, expected {expected}");
    }

    #[test]
    fn gini_degenerate_inputs() {
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn gini_known_value() {
        // [1, 3]: G = 2·(1·1 + 2·3)/(2·4) − 3/2 = 14/8 − 12/8 = 0.25
        let g = gini(&[1.0, 3.0]);
        assert!((g - 0.25).abs() < 1e-12, "got {g}");
    }

    #[test]
    fn lorenz_endpoints() {
        let (xs, ys) = lorenz_curve(&[1.0, 2.0, 3.0, 4.0], 50);
        assert_eq!(xs.len(), 50);
        assert_eq!(ys[0], 0.0);
        assert!(*xs.last().expect("test: nonempty") == 1.0);
        // Curve stays under the diagonal for an unequal distribution.
        for (x, y) in xs.iter().zip(&ys) {
            assert!(*y <= x + 1e-12, "Lorenz above diagonal at x={x}: y={y}");
        }
    }

    #[test]
    fn percentile_linear_interpolation() {
        let values = [30_000.0, 60_000.0, 90_000.0];
        assert!((percentile(&values, 20.0) - 42_000.0).abs() < 1e-9);
        assert!((percentile(&values, 80.0) - 78_000.0).abs() < 1e-9);
        assert_eq!(percentile(&values, 0.0), 30_000.0);
        assert_eq!(percentile(&values, 100.0), 90_000.0);
        assert_eq!(percentile(&values, 50.0), 60_000.0);
    }

    #[test]
    fn stats_mean_and_ci() {
        let s = Stats::from_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert!(s.ci_lower < 3.0 && s.ci_upper > 3.0);
        assert_eq!(s.n, 5);
    }

    #[test]
    fn stats_empty_samples() {
        let s = Stats::from_samples(&[]);
        assert_eq!(s.n, 0);
        assert_eq!(s.mean, 0.0);
    }
}
