//! First-order gradient search over real vectors.
//!
//! One driver loop serves both search directions. The step-selection policy
//! is a configuration value, not a hardcoded choice: `Damped` scales the
//! gradient by a geometrically decaying factor, `Undamped` takes the raw
//! gradient as the step. The search is non-monotone: the working iterate
//! always advances, even through a worsening step, and the best point
//! observed anywhere along the way is what gets returned.

// ─── Configuration ────────────────────────────────────────────────────────────

/// Which way to drive the objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// How the gradient turns into a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepPolicy {
    /// Step `alpha·g`, with `alpha` shrunk by `decay` after every iteration.
    /// Decay closer to 1 converges slower but lands closer to the optimum.
    Damped { alpha: f64, decay: f64 },
    /// Step `g` as-is, no scaling. Assumes the gradient magnitude is itself a
    /// usable step — which holds when the caller pre-scales it, as the
    /// allocation engine does with its liquidity-scaled projected gradient.
    Undamped,
}

/// Tuning for one optimization run.
#[derive(Clone, Copy, Debug)]
pub struct DescentConfig {
    pub direction: Direction,
    pub step: StepPolicy,
    /// Minimum change in objective between consecutive iterates to keep
    /// searching.
    pub improvement: f64,
    /// Hard cap on iterations — the only bound on execution time.
    pub max_iterations: usize,
}

impl DescentConfig {
    /// Damped steepest descent.
    pub fn minimize() -> Self {
        Self {
            direction: Direction::Minimize,
            step: StepPolicy::Damped { alpha: 1.0, decay: 0.9999 },
            improvement: 1e-6,
            max_iterations: 25_000,
        }
    }

    /// Undamped steepest ascent.
    pub fn maximize() -> Self {
        Self {
            direction: Direction::Maximize,
            step: StepPolicy::Undamped,
            improvement: 1e-8,
            max_iterations: 10_000,
        }
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

/// Best point observed during a run.
#[derive(Clone, Debug)]
pub struct Optimum {
    pub x: Vec<f64>,
    pub fx: f64,
}

/// Outcome of one run.
#[derive(Clone, Debug)]
pub struct Descent {
    pub best: Optimum,
    pub iterations: usize,
}

// ─── Driver ───────────────────────────────────────────────────────────────────

/// Iterate `x ← x ± step(g)` from `x0` until the objective stalls, turns
/// non-finite, or the iteration cap is hit. `x0` is never mutated; every
/// iterate is a fresh vector.
///
/// A non-finite objective value is a termination signal, not an error: the
/// search overshot, and the best point seen before the blow-up is returned.
/// Because the iterate advances even on worsening steps, the returned best
/// is not necessarily the final iterate.
pub fn optimize<F, G>(f: F, df: G, x0: &[f64], config: &DescentConfig) -> Descent
where
    F: Fn(&[f64]) -> f64,
    G: Fn(&[f64]) -> Vec<f64>,
{
    let sign = match config.direction {
        Direction::Minimize => -1.0,
        Direction::Maximize => 1.0,
    };
    let mut alpha = match config.step {
        StepPolicy::Damped { alpha, .. } => alpha,
        StepPolicy::Undamped => 1.0,
    };

    let mut x = x0.to_vec();
    let mut fx = f(&x);
    let mut best = Optimum { x: x.clone(), fx };

    if !fx.is_finite() {
        return Descent { best, iterations: 0 };
    }

    let mut iterations = 0;
    while iterations < config.max_iterations {
        iterations += 1;

        let g = df(&x);
        let xn: Vec<f64> = x
            .iter()
            .zip(&g)
            .map(|(xi, gi)| xi + sign * alpha * gi)
            .collect();

        let prev = fx;
        fx = f(&xn);

        let improved = match config.direction {
            Direction::Minimize => fx < best.fx,
            Direction::Maximize => fx > best.fx,
        };
        if improved {
            best = Optimum { x: xn.clone(), fx };
        }

        if (prev - fx).abs() < config.improvement || !fx.is_finite() {
            break;
        }

        if let StepPolicy::Damped { decay, .. } = config.step {
            alpha *= decay;
        }

        x = xn;
    }

    Descent { best, iterations }
}
