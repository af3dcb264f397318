use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Pool Yield Model ─────────────────────────────────────────────────────────

/// A yield source modeled by a two-parameter diminishing-returns curve:
///
/// interest(x, dt) = a·dt·x / (b + x)
///
/// `a` is the saturation ceiling (the interest accrued as x → ∞ over a unit
/// horizon) and `b` the half-saturation depth (the supply at which half the
/// ceiling is reached). Invariants: `a >= 0`, `b > 0`, both finite — checked
/// at the allocation API boundary, not at construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub a: f64,
    pub b: f64,
}

impl Pool {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Interest accrued over duration `dt` having supplied `x`.
    ///
    /// An infinite `x` is a sentinel for "parked elsewhere at capacity" and
    /// returns the ceiling `a·dt` directly (first-order approximation; the
    /// naive formula would produce 0·∞ = NaN).
    #[inline]
    pub fn interest(&self, x: f64, dt: f64) -> f64 {
        if x.is_infinite() {
            return self.a * dt;
        }
        (self.a * dt / (self.b + x)) * x
    }

    /// Marginal interest dI/dx = a·b / (b + x)² over a unit horizon.
    ///
    /// Strictly positive and monotonically decreasing in `x`: the curve is
    /// concave, so ascent toward equal marginal yield is well-posed.
    #[inline]
    pub fn marginal(&self, x: f64) -> f64 {
        self.a * self.b / ((self.b + x) * (self.b + x))
    }

    /// Interest net of a flat participation cost.
    #[inline]
    pub fn profit(&self, x: f64, cost: f64, dt: f64) -> f64 {
        self.interest(x, dt) - cost
    }
}

/// Aggregate interest of an allocation vector across its pools.
pub fn total_interest(x: &[f64], pools: &[Pool], dt: f64) -> f64 {
    x.iter().zip(pools).map(|(&xi, p)| p.interest(xi, dt)).sum()
}

/// Aggregate profit of an allocation vector, each pool paying `cost` once.
pub fn total_profit(x: &[f64], pools: &[Pool], cost: f64, dt: f64) -> f64 {
    x.iter().zip(pools).map(|(&xi, p)| p.profit(xi, cost, dt)).sum()
}

// ─── Domain Errors ────────────────────────────────────────────────────────────

/// Rejections raised at the allocation API boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// Pool parameters outside the model's domain (`b <= 0`, `a < 0`, or
    /// non-finite). The curve divides by `b + x`, so a non-positive `b`
    /// divides by zero or flips sign inside the feasible range.
    InvalidPool { index: usize, a: f64, b: f64 },
    /// Total liquidity is negative or non-finite.
    InvalidLiquidity(f64),
    /// Allocation vector length differs from the pool list length.
    DimensionMismatch { entries: usize, pools: usize },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidPool { index, a, b } => {
                write!(f, "pool {index} has parameters outside the model domain (a={a}, b={b}; need a >= 0, b > 0)")
            }
            ModelError::InvalidLiquidity(l) => {
                write!(f, "total liquidity must be finite and non-negative, got {l}")
            }
            ModelError::DimensionMismatch { entries, pools } => {
                write!(f, "allocation has {entries} entries but {pools} pools were given")
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// Reject pool parameters the yield formula is undefined for.
pub fn validate_pools(pools: &[Pool]) -> Result<(), ModelError> {
    for (index, p) in pools.iter().enumerate() {
        if !(p.b > 0.0) || !(p.a >= 0.0) || !p.a.is_finite() || !p.b.is_finite() {
            return Err(ModelError::InvalidPool { index, a: p.a, b: p.b });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_supply_hits_the_ceiling() {
        let pool = Pool::new(10.0, 50.0);
        assert_eq!(pool.interest(f64::INFINITY, 1.0), 10.0);
        assert_eq!(pool.interest(f64::INFINITY, 2.0), 20.0);
        // marginal vanishes at the sentinel
        assert_eq!(pool.marginal(f64::INFINITY), 0.0);
    }

    #[test]
    fn marginal_is_positive_and_decreasing() {
        let pool = Pool::new(20.0, 1000.0);
        let mut prev = f64::INFINITY;
        for i in 0..100 {
            let m = pool.marginal(i as f64 * 50.0);
            assert!(m > 0.0, "marginal non-positive at x={}", i * 50);
            assert!(m < prev, "marginal not decreasing at x={}", i * 50);
            prev = m;
        }
    }

    #[test]
    fn interest_scales_with_horizon() {
        let pool = Pool::new(20.0, 1000.0);
        let one_year = pool.interest(500.0, 1.0);
        assert!((pool.interest(500.0, 0.5) - one_year * 0.5).abs() < 1e-12);
        assert!((one_year - 20.0 * 500.0 / 1500.0).abs() < 1e-12);
    }

    #[test]
    fn validation_rejects_degenerate_parameters() {
        assert!(validate_pools(&[Pool::new(20.0, 1000.0)]).is_ok());
        for bad in [
            Pool::new(20.0, 0.0),
            Pool::new(20.0, -5.0),
            Pool::new(-1.0, 1000.0),
            Pool::new(f64::NAN, 1000.0),
            Pool::new(20.0, f64::INFINITY),
        ] {
            let err = validate_pools(&[Pool::new(10.0, 10.0), bad]).unwrap_err();
            assert!(
                matches!(err, ModelError::InvalidPool { index: 1, .. }),
                "expected InvalidPool at index 1, got {err:?}"
            );
        }
    }
}
