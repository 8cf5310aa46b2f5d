// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Traffic Fine Policy Simulation Suite - Bounded Numerical Solvers

// ─── Solution ────────────────────────────────────────────────────────────────

/// Result of a bounded minimization.
#[derive(Debug, Clone)]
pub struct Solution {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: u32,
}

/// Errors from the bounded solvers.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("{method} failed to converge within {max_iterations} iterations")]
    DidNotConverge {
        method: &'static str,
        max_iterations: u32,
    },
}

// ─── Box scaling ─────────────────────────────────────────────────────────────

// All solvers work in unit-box coordinates so that labor hours (0..2080) and
// speeding intensity (0..1) step at comparable scales.

fn to_unit(x: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    x.iter()
        .zip(bounds)
        .map(|(&v, &(lo, hi))| {
            if hi > lo {
                ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

fn from_unit(z: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    z.iter()
        .zip(bounds)
        .map(|(&v, &(lo, hi))| lo + v.clamp(0.0, 1.0) * (hi - lo))
        .collect()
}

fn clamp_unit(z: &mut [f64]) {
    for v in z.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
}

// ─── Projected gradient descent ──────────────────────────────────────────────

const GRAD_MAX_ITERATIONS: u32 = 500;
const GRAD_STEP_H: f64 = 1e-6;
const GRAD_PG_TOLERANCE: f64 = 1e-6;
const GRAD_F_TOLERANCE: f64 = 1e-12;
const ARMIJO_C: f64 = 1e-4;
// The utility surface couples a stiff labor direction to a nearly flat
// speeding direction, so the step length is set spectrally (Barzilai-Borwein)
// and clamped to a sane range.
const BB_STEP_MIN: f64 = 1e-8;
const BB_STEP_MAX: f64 = 1e3;

/// Minimize `f` over an axis-aligned box with spectral projected gradient
/// descent (Barzilai-Borwein step, Armijo backtracking along the projected
/// direction).
///
/// The gradient is estimated with central differences in unit-box
/// coordinates. Convergence is declared when the projected gradient step is
/// below tolerance or the objective stops improving; running out of the
/// iteration cap is an error, not a silent partial answer.
pub fn minimize_gradient<F>(
    f: F,
    bounds: &[(f64, f64)],
    x0: &[f64],
) -> Result<Solution, SolverError>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = bounds.len();
    let fz = |z: &[f64]| f(&from_unit(z, bounds));
    let grad = |z: &[f64]| -> Vec<f64> {
        let mut g = vec![0.0; dim];
        for i in 0..dim {
            let mut zp = z.to_vec();
            let mut zm = z.to_vec();
            zp[i] += GRAD_STEP_H;
            zm[i] -= GRAD_STEP_H;
            g[i] = (fz(&zp) - fz(&zm)) / (2.0 * GRAD_STEP_H);
        }
        g
    };

    let mut z = to_unit(x0, bounds);
    let mut fx = fz(&z);
    let mut g = grad(&z);
    let mut alpha = {
        let g_max = g.iter().fold(0.0_f64, |m, &gi| m.max(gi.abs()));
        if g_max > 0.0 { (1.0 / g_max).clamp(BB_STEP_MIN, 1.0) } else { 1.0 }
    };
    let mut flat_steps: u32 = 0;

    for iteration in 1..=GRAD_MAX_ITERATIONS {
        // Projected gradient norm: ‖z − clamp(z − g)‖∞
        let pg_norm = z
            .iter()
            .zip(&g)
            .map(|(&zi, &gi)| (zi - (zi - gi).clamp(0.0, 1.0)).abs())
            .fold(0.0_f64, f64::max);
        if pg_norm < GRAD_PG_TOLERANCE {
            return Ok(Solution {
                x: from_unit(&z, bounds),
                value: fx,
                iterations: iteration,
            });
        }

        // Projected direction for the spectral step length.
        let direction: Vec<f64> = z
            .iter()
            .zip(&g)
            .map(|(&zi, &gi)| (zi - alpha * gi).clamp(0.0, 1.0) - zi)
            .collect();
        let slope: f64 = g.iter().zip(&direction).map(|(&gi, &di)| gi * di).sum();

        // Backtracking Armijo search along the projected direction.
        let mut lambda = 1.0;
        let mut accepted = None;
        for _ in 0..40 {
            let trial: Vec<f64> = z
                .iter()
                .zip(&direction)
                .map(|(&zi, &di)| (zi + lambda * di).clamp(0.0, 1.0))
                .collect();
            let f_trial = fz(&trial);
            if f_trial <= fx + ARMIJO_C * lambda * slope.min(0.0) && f_trial < fx {
                accepted = Some((trial, f_trial));
                break;
            }
            lambda *= 0.5;
        }

        let (z_new, f_new) = match accepted {
            Some(step) => step,
            None => {
                // No descent left at working precision; accept only if the
                // projected gradient is already near-flat.
                if pg_norm < 1e-4 {
                    return Ok(Solution {
                        x: from_unit(&z, bounds),
                        value: fx,
                        iterations: iteration,
                    });
                }
                return Err(SolverError::DidNotConverge {
                    method: "projected gradient",
                    max_iterations: GRAD_MAX_ITERATIONS,
                });
            }
        };

        if (fx - f_new).abs() < GRAD_F_TOLERANCE * (1.0 + fx.abs()) {
            flat_steps += 1;
        } else {
            flat_steps = 0;
        }

        // Barzilai-Borwein step update: alpha = sᵀs / sᵀy.
        let g_new = grad(&z_new);
        let mut ss = 0.0;
        let mut sy = 0.0;
        for i in 0..dim {
            let s = z_new[i] - z[i];
            let y = g_new[i] - g[i];
            ss += s * s;
            sy += s * y;
        }
        alpha = if sy > 1e-14 {
            (ss / sy).clamp(BB_STEP_MIN, BB_STEP_MAX)
        } else {
            BB_STEP_MAX
        };

        z = z_new;
        fx = f_new;
        g = g_new;

        if flat_steps >= 3 {
            return Ok(Solution {
                x: from_unit(&z, bounds),
                value: fx,
                iterations: iteration,
            });
        }
    }

    Err(SolverError::DidNotConverge {
        method: "projected gradient",
        max_iterations: GRAD_MAX_ITERATIONS,
    })
}

// ─── Bounded Nelder-Mead ─────────────────────────────────────────────────────

const NM_ALPHA: f64 = 1.0; // reflection
const NM_GAMMA: f64 = 2.0; // expansion
const NM_RHO: f64 = 0.5; // contraction
const NM_SIGMA: f64 = 0.5; // shrink
const NM_SIZE_TOLERANCE: f64 = 1e-7;
const NM_F_TOLERANCE: f64 = 1e-10;

/// Minimize `f` over an axis-aligned box with a clamped Nelder-Mead simplex.
///
/// Derivative-free; used as the fallback when the gradient solver stalls and
/// as the outer policy-parameter search. `max_iterations` bounds simplex
/// updates, not objective evaluations.
pub fn minimize_simplex<F>(
    f: F,
    bounds: &[(f64, f64)],
    x0: &[f64],
    max_iterations: u32,
) -> Result<Solution, SolverError>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = bounds.len();
    let fz = |z: &[f64]| f(&from_unit(z, bounds));

    // Initial simplex: start point plus a 10% step along each axis.
    let z0 = to_unit(x0, bounds);
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(z0.clone());
    for i in 0..dim {
        let mut v = z0.clone();
        v[i] = if v[i] + 0.1 <= 1.0 { v[i] + 0.1 } else { v[i] - 0.1 };
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| fz(v)).collect();

    for iteration in 1..=max_iterations {
        // Order vertices by objective value.
        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let simplex_sorted: Vec<Vec<f64>> = order.iter().map(|&i| simplex[i].clone()).collect();
        let values_sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();
        simplex = simplex_sorted;
        values = values_sorted;

        // Convergence: simplex collapsed in both size and value spread.
        let size = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        let spread = values[dim] - values[0];
        if size < NM_SIZE_TOLERANCE && spread.abs() < NM_F_TOLERANCE {
            return Ok(Solution {
                x: from_unit(&simplex[0], bounds),
                value: values[0],
                iterations: iteration,
            });
        }

        // Centroid of all but the worst vertex.
        let mut centroid = vec![0.0; dim];
        for v in &simplex[..dim] {
            for (c, &vi) in centroid.iter_mut().zip(v) {
                *c += vi / dim as f64;
            }
        }

        let worst = values[dim];
        let second_worst = values[dim - 1];
        let best = values[0];

        let mut reflected: Vec<f64> = centroid
            .iter()
            .zip(&simplex[dim])
            .map(|(&c, &w)| c + NM_ALPHA * (c - w))
            .collect();
        clamp_unit(&mut reflected);
        let f_reflected = fz(&reflected);

        if f_reflected < best {
            let mut expanded: Vec<f64> = centroid
                .iter()
                .zip(&reflected)
                .map(|(&c, &r)| c + NM_GAMMA * (r - c))
                .collect();
            clamp_unit(&mut expanded);
            let f_expanded = fz(&expanded);
            if f_expanded < f_reflected {
                simplex[dim] = expanded;
                values[dim] = f_expanded;
            } else {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
            }
        } else if f_reflected < second_worst {
            simplex[dim] = reflected;
            values[dim] = f_reflected;
        } else {
            let mut contracted: Vec<f64> = centroid
                .iter()
                .zip(&simplex[dim])
                .map(|(&c, &w)| c + NM_RHO * (w - c))
                .collect();
            clamp_unit(&mut contracted);
            let f_contracted = fz(&contracted);
            if f_contracted < worst {
                simplex[dim] = contracted;
                values[dim] = f_contracted;
            } else {
                // Shrink toward the best vertex.
                for i in 1..=dim {
                    let shrunk: Vec<f64> = simplex[0]
                        .iter()
                        .zip(&simplex[i])
                        .map(|(&b, &v)| b + NM_SIGMA * (v - b))
                        .collect();
                    simplex[i] = shrunk;
                    values[i] = fz(&simplex[i]);
                }
            }
        }
    }

    Err(SolverError::DidNotConverge {
        method: "nelder-mead",
        max_iterations,
    })
}

// ─── Golden-section search ───────────────────────────────────────────────────

const GOLDEN_INV: f64 = 0.618_033_988_749_894_8; // 1/φ
const SCALAR_TOLERANCE: f64 = 1e-8;

/// Minimize a scalar function on `[lo, hi]` by golden-section search.
///
/// Always terminates; the interval shrinks by 1/φ per step, so ~80 steps
/// resolve any practical bracket to tolerance.
pub fn minimize_scalar<F>(f: F, lo: f64, hi: f64) -> Solution
where
    F: Fn(f64) -> f64,
{
    let mut a = lo;
    let mut b = hi;
    let mut c = b - GOLDEN_INV * (b - a);
    let mut d = a + GOLDEN_INV * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    let mut iterations = 0;

    while (b - a).abs() > SCALAR_TOLERANCE * (1.0 + a.abs() + b.abs()) && iterations < 200 {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - GOLDEN_INV * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + GOLDEN_INV * (b - a);
            fd = f(d);
        }
        iterations += 1;
    }

    let x = 0.5 * (a + b);
    Solution {
        value: f(x),
        x: vec![x],
        iterations,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
