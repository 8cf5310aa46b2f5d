// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Fine schedules -- the three statutory fine structures.
//!
//! A schedule maps gross income to a fine amount. The simulation engine and
//! the welfare optimizer treat a schedule as a pure function whose parameter
//! vector is only ever replaced between full simulation runs.
//!
//! Parameters are carried as `rust_decimal::Decimal` so bracket arithmetic is
//! exact money math; the public surface converts at the f64 boundary.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from schedule construction and parameter replacement.
#[derive(Debug, thiserror::Error)]
pub enum FineError {
    #[error("{kind} schedule requires exactly {expected} parameter(s), got {got}")]
    ParameterArity {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("bracket floors and rates must have equal, non-zero length")]
    BracketMismatch,

    #[error("unknown fine schedule kind: {0}")]
    UnknownKind(String),
}

// ---------------------------------------------------------------------------
// Decimal boundary helpers
// ---------------------------------------------------------------------------

/// Convert f64 to Decimal (lossy but sufficient for simulation).
pub(crate) fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
}

/// Convert Decimal to f64.
pub(crate) fn from_decimal(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// FineSchedule
// ---------------------------------------------------------------------------

/// Closed union of the three fine structures under study.
///
/// The welfare optimizer branches on the variant when interpreting its
/// parameter vector, so the set is deliberately closed rather than a trait
/// object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FineSchedule {
    /// Everyone pays the same amount regardless of income.
    Flat { amount: Decimal },
    /// Day-fine style: `base + slope * income`.
    IncomeBased { base: Decimal, slope: Decimal },
    /// Bracketed rates on income segments; the last bracket is unbounded.
    Progressive {
        brackets: Vec<Decimal>,
        rates: Vec<Decimal>,
    },
}

impl FineSchedule {
    pub fn flat(amount: f64) -> Self {
        Self::Flat {
            amount: to_decimal(amount),
        }
    }

    pub fn income_based(base: f64, slope: f64) -> Self {
        Self::IncomeBased {
            base: to_decimal(base),
            slope: to_decimal(slope),
        }
    }

    /// Bracket floors must be ascending with the same length as `rates`.
    pub fn progressive(brackets: &[f64], rates: &[f64]) -> Result<Self, FineError> {
        if brackets.is_empty() || brackets.len() != rates.len() {
            return Err(FineError::BracketMismatch);
        }
        Ok(Self::Progressive {
            brackets: brackets.iter().copied().map(to_decimal).collect(),
            rates: rates.iter().copied().map(to_decimal).collect(),
        })
    }

    /// Build a schedule from a kind string and a flat parameter vector.
    ///
    /// Used by the wasm adapter and the bench runner; `"progressive"` expects
    /// the floors followed by the rates.
    pub fn from_kind(kind: &str, params: &[f64]) -> Result<Self, FineError> {
        match kind {
            "flat" => {
                if params.len() != 1 {
                    return Err(FineError::ParameterArity {
                        kind: "flat",
                        expected: 1,
                        got: params.len(),
                    });
                }
                Ok(Self::flat(params[0]))
            }
            "income_based" => {
                if params.len() != 2 {
                    return Err(FineError::ParameterArity {
                        kind: "income_based",
                        expected: 2,
                        got: params.len(),
                    });
                }
                Ok(Self::income_based(params[0], params[1]))
            }
            "progressive" => {
                if params.is_empty() || params.len() % 2 != 0 {
                    return Err(FineError::BracketMismatch);
                }
                let n = params.len() / 2;
                Self::progressive(&params[..n], &params[n..])
            }
            other => Err(FineError::UnknownKind(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Flat { .. } => "flat",
            Self::IncomeBased { .. } => "income_based",
            Self::Progressive { .. } => "progressive",
        }
    }

    /// Fine owed at a given gross income.
    pub fn calculate_fine(&self, income: f64) -> f64 {
        let income = to_decimal(income.max(0.0));
        match self {
            Self::Flat { amount } => from_decimal(*amount),
            Self::IncomeBased { base, slope } => from_decimal(*base + *slope * income),
            Self::Progressive { brackets, rates } => {
                if brackets.is_empty() || brackets.len() != rates.len() {
                    return 0.0;
                }
                let mut fine = Decimal::ZERO;
                let last = brackets.len() - 1;
                for i in 0..brackets.len() {
                    if i == last {
                        let above = (income - brackets[i]).max(Decimal::ZERO);
                        fine += above * rates[i];
                    } else {
                        let segment =
                            (income.min(brackets[i + 1]) - brackets[i]).max(Decimal::ZERO);
                        fine += segment * rates[i];
                        if income <= brackets[i + 1] {
                            break;
                        }
                    }
                }
                from_decimal(fine)
            }
        }
    }

    /// Marginal fine rate at a given gross income.
    ///
    /// Flat schedules have a zero marginal rate everywhere; income-based a
    /// constant slope; progressive the rate of the highest bracket whose
    /// floor lies at or below the income.
    pub fn marginal_rate(&self, income: f64) -> f64 {
        let income = to_decimal(income.max(0.0));
        match self {
            Self::Flat { .. } => 0.0,
            Self::IncomeBased { slope, .. } => from_decimal(*slope),
            Self::Progressive { brackets, rates } => {
                if brackets.is_empty() || brackets.len() != rates.len() {
                    return 0.0;
                }
                for i in (0..brackets.len()).rev() {
                    if income >= brackets[i] {
                        return from_decimal(rates[i]);
                    }
                }
                from_decimal(rates[0])
            }
        }
    }

    /// Current parameter vector (progressive: floors then rates).
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            Self::Flat { amount } => vec![from_decimal(*amount)],
            Self::IncomeBased { base, slope } => {
                vec![from_decimal(*base), from_decimal(*slope)]
            }
            Self::Progressive { brackets, rates } => brackets
                .iter()
                .chain(rates.iter())
                .copied()
                .map(from_decimal)
                .collect(),
        }
    }

    /// Expected parameter vector length for this variant.
    pub fn arity(&self) -> usize {
        match self {
            Self::Flat { .. } => 1,
            Self::IncomeBased { .. } => 2,
            Self::Progressive { brackets, .. } => brackets.len() * 2,
        }
    }

    /// Replace the parameter vector in place.
    ///
    /// The vector length must match the variant's arity exactly; a mismatch
    /// is a hard error and leaves the schedule untouched.
    pub fn set_parameters(&mut self, params: &[f64]) -> Result<(), FineError> {
        let expected = self.arity();
        if params.len() != expected {
            return Err(FineError::ParameterArity {
                kind: self.kind(),
                expected,
                got: params.len(),
            });
        }
        match self {
            Self::Flat { amount } => *amount = to_decimal(params[0]),
            Self::IncomeBased { base, slope } => {
                *base = to_decimal(params[0]);
                *slope = to_decimal(params[1]);
            }
            Self::Progressive { brackets, rates } => {
                let n = brackets.len();
                *brackets = params[..n].iter().copied().map(to_decimal).collect();
                *rates = params[n..].iter().copied().map(to_decimal).collect();
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
