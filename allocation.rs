//! Constrained liquidity allocation across yield pools.
//!
//! `allocate` runs projected gradient ascent on the liquidity hyperplane
//! Σxᵢ = L with xᵢ >= 0. Each ascent step takes the raw per-pool marginal
//! gradient, projects it onto the constant-sum subspace, and pins to zero any
//! pool the step would drive negative (an active-set pass), so every iterate
//! stays feasible. `narrow` is a one-shot post-process that zeroes pools
//! whose interest does not cover a flat participation cost and redistributes
//! their capital; it never re-optimizes.

use serde::Serialize;

use crate::descent::{optimize, DescentConfig};
use crate::model::{total_interest, validate_pools, ModelError, Pool};

// ─── Allocation Context ───────────────────────────────────────────────────────

/// Read-only inputs shared by the objective and gradient of one `allocate`
/// call. An explicit context rather than captured environment, so both
/// functions stay pure and independently testable.
pub struct AllocContext<'a> {
    pub pools: &'a [Pool],
    pub total: f64,
}

impl AllocContext<'_> {
    /// Aggregate interest over a unit horizon.
    pub fn objective(&self, x: &[f64]) -> f64 {
        total_interest(x, self.pools, 1.0)
    }

    /// Feasible ascent direction at `x`: the per-pool marginal gradient
    /// scaled by total liquidity, projected so that following it keeps Σxᵢ
    /// fixed and every component non-negative.
    ///
    /// Projection onto the constant-sum subspace is mean subtraction. When
    /// the projected step would drive some xᵢ below zero, that pool is
    /// pinned: its component is clamped to exactly -xᵢ (driving it to the
    /// boundary, not past it) and the projection is recomputed over the
    /// still-active pools, repeating until no pool underflows. Should the
    /// active set empty out there is no feasible ascent direction and the
    /// zero vector comes back. Once the active set is stable, the deficit
    /// the clamps left on the hyperplane is spread across the active pools
    /// so the step preserves the sum exactly.
    pub fn feasible_direction(&self, x: &[f64]) -> Vec<f64> {
        let dim = x.len();
        if dim == 0 {
            return vec![];
        }
        let mut dir: Vec<f64> = x
            .iter()
            .zip(self.pools)
            .map(|(&xi, p)| p.marginal(xi) * self.total)
            .collect();

        let mut active = dim as f64;
        let mut live = vec![true; dim];

        let mean = dir.iter().sum::<f64>() / active;
        for d in dir.iter_mut() {
            *d -= mean;
        }

        loop {
            let mut pinned = false;
            for i in 0..dim {
                if live[i] && x[i] + dir[i] < 0.0 {
                    dir[i] = -x[i];
                    live[i] = false;
                    active -= 1.0;
                    pinned = true;
                }
            }
            if !pinned {
                break;
            }
            if active < 1.0 {
                dir.fill(0.0);
                return dir;
            }
            let dot: f64 = dir.iter().zip(&live).filter(|&(_, &l)| l).map(|(d, _)| d).sum();
            for (d, &l) in dir.iter_mut().zip(&live) {
                if l {
                    *d -= dot / active;
                }
            }
        }

        // The clamps pulled the step off the hyperplane by the pinned pools'
        // mass; hand it back to the active pools so Σ(x + dir) stays at L.
        let deficit: f64 = dir.iter().sum();
        if deficit != 0.0 {
            for (d, &l) in dir.iter_mut().zip(&live) {
                if l {
                    *d -= deficit / active;
                }
            }
        }

        dir
    }
}

// ─── Allocate ─────────────────────────────────────────────────────────────────

/// Result of one `allocate` call.
#[derive(Clone, Debug, Serialize)]
pub struct Allocation {
    /// Per-pool allocation; sums to the requested total, every entry >= 0.
    pub allocation: Vec<f64>,
    /// Aggregate interest accrued by the allocation over a unit horizon.
    pub interests: f64,
    /// Optimizer iterations spent.
    pub steps: usize,
}

/// Distribute `total` across `pools` so aggregate interest is maximized.
///
/// Seeds the search at the uniform split and ascends along feasible projected
/// gradients. Zero pools is a valid degenerate input, not an error: all
/// capital stays idle and the result is empty.
pub fn allocate(total: f64, pools: &[Pool]) -> Result<Allocation, ModelError> {
    validate_pools(pools)?;
    if !total.is_finite() || total < 0.0 {
        return Err(ModelError::InvalidLiquidity(total));
    }

    let dim = pools.len();
    if dim == 0 {
        return Ok(Allocation { allocation: vec![], interests: 0.0, steps: 0 });
    }

    let ctx = AllocContext { pools, total };
    let seed = vec![total / dim as f64; dim];
    let run = optimize(
        |x| ctx.objective(x),
        |x| ctx.feasible_direction(x),
        &seed,
        &DescentConfig::maximize(),
    );

    Ok(Allocation {
        allocation: run.best.x,
        interests: run.best.fx,
        steps: run.iterations,
    })
}

// ─── Narrow ───────────────────────────────────────────────────────────────────

/// Consolidate an existing feasible allocation away from pools whose interest
/// at the current level does not cover `pool_cost`.
///
/// Below-threshold pools are zeroed and their capital spread across the
/// surviving pools through the same constant-sum projection — one shot, no
/// iteration, no re-optimization, so the result is feasible but not
/// necessarily value-maximizing. If every pool fails the threshold the zero
/// vector comes back: no pool is economically worth a position.
pub fn narrow(x: &[f64], pools: &[Pool], pool_cost: f64) -> Result<Vec<f64>, ModelError> {
    validate_pools(pools)?;
    if x.len() != pools.len() {
        return Err(ModelError::DimensionMismatch { entries: x.len(), pools: pools.len() });
    }

    let dim = x.len();
    let total: f64 = x.iter().sum();

    let mut out = x.to_vec();
    let mut active = dim as f64;
    let mut live = vec![true; dim];

    for i in 0..dim {
        if pools[i].interest(out[i], 1.0) < pool_cost {
            out[i] = 0.0;
            live[i] = false;
            active -= 1.0;
        }
    }

    if active < 1.0 {
        out.fill(0.0);
        return Ok(out);
    }

    // Project back onto the hyperplane: the removed mass goes to survivors.
    let dot = out.iter().sum::<f64>() - total;
    for (xi, &l) in out.iter_mut().zip(&live) {
        if l {
            *xi -= dot / active;
        }
    }

    Ok(out)
}
