//! Integration tests for the allocation engine, driven through the public
//! API the way a caller would use it: allocate, inspect, narrow.

#[cfg(test)]
mod integration {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use yield_alloc_engine::allocation::{allocate, narrow};
    use yield_alloc_engine::batch::{summarize, sweep, Scenario};
    use yield_alloc_engine::model::{total_interest, Pool};

    /// The four-pool reference case: L = 3000 across (a, b) rate models.
    fn reference_pools() -> Vec<Pool> {
        vec![
            Pool::new(20.0, 1000.0),
            Pool::new(30.0, 2000.0),
            Pool::new(20.0, 2000.0),
            Pool::new(15.0, 3000.0),
        ]
    }

    // ── allocate: reference scenario ──────────────────────────────────────────

    #[test]
    fn reference_case_beats_the_even_split() {
        let pools = reference_pools();
        let result = allocate(3000.0, &pools).unwrap();

        let even = vec![750.0; 4];
        let even_interests = total_interest(&even, &pools, 1.0);

        assert!(
            result.interests > even_interests,
            "optimized {:.4} not above even split {:.4}",
            result.interests,
            even_interests
        );
    }

    #[test]
    fn reference_case_conserves_total_and_stays_nonnegative() {
        let pools = reference_pools();
        let result = allocate(3000.0, &pools).unwrap();

        let sum: f64 = result.allocation.iter().sum();
        assert!(
            (sum - 3000.0).abs() < 1e-6 * 3000.0,
            "total not conserved: Σ={sum:.9}"
        );
        for (i, &xi) in result.allocation.iter().enumerate() {
            assert!(xi >= 0.0, "pool {i} went negative: {xi}");
        }
    }

    #[test]
    fn marginals_equalize_across_interior_pools() {
        // At the optimum every pool holding a strictly interior position must
        // show the same marginal yield; pools pinned at zero may sit below it.
        let pools = reference_pools();
        let result = allocate(3000.0, &pools).unwrap();

        let interior: Vec<f64> = result
            .allocation
            .iter()
            .zip(&pools)
            .filter(|&(&xi, _)| xi > 1.0)
            .map(|(&xi, p)| p.marginal(xi))
            .collect();
        assert!(interior.len() >= 2, "expected several interior pools");

        let lo = interior.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = interior.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(
            (hi - lo) / hi < 1e-2,
            "interior marginals spread too wide: [{lo:.6e}, {hi:.6e}]"
        );

        // the weakest pool is squeezed toward the boundary in this case
        assert!(
            result.allocation[3] < 750.0,
            "weakest pool kept its even share: {:?}",
            result.allocation
        );
    }

    // ── allocate: degenerate shapes ───────────────────────────────────────────

    #[test]
    fn single_pool_takes_the_whole_total() {
        let result = allocate(100.0, &[Pool::new(10.0, 50.0)]).unwrap();
        assert_eq!(result.allocation, vec![100.0]);
        assert!(
            (result.interests - 10.0 * 100.0 / 150.0).abs() < 1e-9,
            "interests={}",
            result.interests
        );
    }

    #[test]
    fn zero_pools_is_a_valid_idle_outcome() {
        let result = allocate(1000.0, &[]).unwrap();
        assert!(result.allocation.is_empty());
        assert_eq!(result.interests, 0.0);
        assert_eq!(result.steps, 0);
    }

    #[test]
    fn zero_liquidity_allocates_nothing() {
        let result = allocate(0.0, &reference_pools()).unwrap();
        assert_eq!(result.allocation, vec![0.0; 4]);
        assert_eq!(result.interests, 0.0);
    }

    // ── narrow ────────────────────────────────────────────────────────────────

    #[test]
    fn narrow_drops_pools_below_cost_and_conserves_mass() {
        let pools = reference_pools();
        // interests at this spread: [10.0, 12.857, 3.333, 0.484]
        let x = vec![1000.0, 1500.0, 400.0, 100.0];

        let out = narrow(&x, &pools, 5.0).unwrap();

        assert_eq!(out[2], 0.0, "below-cost pool kept capital: {out:?}");
        assert_eq!(out[3], 0.0, "below-cost pool kept capital: {out:?}");
        // 500 units removed, spread evenly over the two survivors
        assert!((out[0] - 1250.0).abs() < 1e-9);
        assert!((out[1] - 1750.0).abs() < 1e-9);
        let sum: f64 = out.iter().sum();
        assert!((sum - 3000.0).abs() < 1e-9, "mass not conserved: Σ={sum}");
    }

    #[test]
    fn narrow_is_idempotent() {
        let pools = reference_pools();
        let x = vec![1000.0, 1500.0, 400.0, 100.0];

        let once = narrow(&x, &pools, 5.0).unwrap();
        let twice = narrow(&once, &pools, 5.0).unwrap();
        assert_eq!(once, twice, "second narrow pass changed the allocation");
    }

    #[test]
    fn narrow_zeroes_everything_when_no_pool_clears_cost() {
        let pools = reference_pools();
        // ceilings top out at a = 30, so a cost of 50 is unreachable
        let out = narrow(&[750.0, 750.0, 750.0, 750.0], &pools, 50.0).unwrap();
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn narrow_after_allocate_keeps_feasibility() {
        let pools = reference_pools();
        let result = allocate(3000.0, &pools).unwrap();
        let out = narrow(&result.allocation, &pools, 6.0).unwrap();

        let sum: f64 = out.iter().sum();
        assert!((sum - 3000.0).abs() < 1e-6 * 3000.0, "Σ={sum:.9}");
        assert!(out.iter().all(|&v| v >= 0.0), "negative entry: {out:?}");
        // survivors must still clear the cost
        for (p, &xi) in pools.iter().zip(&out) {
            if xi > 0.0 {
                assert!(p.interest(xi, 1.0) >= 6.0, "survivor below cost: {out:?}");
            }
        }
    }

    // ── randomized coverage ───────────────────────────────────────────────────

    #[test]
    fn randomized_scenarios_hold_the_core_invariants() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for trial in 0..120 {
            let s = Scenario::sample(&mut rng);
            let result = allocate(s.total, &s.pools).unwrap();

            let sum: f64 = result.allocation.iter().sum();
            assert!(
                (sum - s.total).abs() < 1e-6 * s.total.max(1.0),
                "trial {trial}: Σ={sum:.9} vs L={}",
                s.total
            );
            assert!(
                result.allocation.iter().all(|&v| v >= 0.0),
                "trial {trial}: negative entry in {:?}",
                result.allocation
            );
            assert!(
                result.interests >= s.uniform_interests() - 1e-9,
                "trial {trial}: worse than the uniform seed"
            );
        }
    }

    #[test]
    fn seeded_sweep_is_reproducible_and_feasible() {
        let a = sweep(16, 100).unwrap();
        let b = sweep(16, 100).unwrap();
        for (ra, rb) in a.iter().zip(&b) {
            assert_eq!(ra.scenario.total, rb.scenario.total);
            assert_eq!(ra.result.allocation, rb.result.allocation);
        }

        let summary = summarize(&a);
        assert_eq!(summary.scenarios, 16);
        assert!(summary.mean_uplift_pct >= 0.0, "sweep lost to the even split");
        assert!(summary.max_conservation_error < 1e-3, "{summary:?}");
        assert!(summary.min_entry >= 0.0, "{summary:?}");
    }
}
