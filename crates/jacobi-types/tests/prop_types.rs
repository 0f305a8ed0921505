// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Property-Based Tests (proptest) for jacobi-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for jacobi-types using proptest.
//!
//! Covers: configuration serialization roundtrip, validation bounds,
//! exit predicate.

use jacobi_types::config::SolverConfig;
use jacobi_types::state::IterationState;
use proptest::prelude::*;

proptest! {
    /// JSON serialization preserves every field.
    #[test]
    fn config_json_roundtrip(
        exp in 0u32..6,
        max_iterations in 1usize..10_000,
        threshold in 1e-9f64..10.0,
        local_parallelism in any::<bool>(),
        record_history in any::<bool>(),
    ) {
        let cfg = SolverConfig {
            worker_count: 1usize << exp,
            max_iterations,
            convergence_threshold: threshold,
            coordinator: 0,
            local_parallelism,
            record_history,
        };
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: SolverConfig = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(back, cfg);
    }

    /// Any coordinator inside the group is accepted, any outside rejected.
    #[test]
    fn coordinator_bounds(exp in 0u32..6, offset in 0usize..64) {
        let worker_count = 1usize << exp;
        let cfg = SolverConfig {
            coordinator: offset,
            ..SolverConfig::with_workers(worker_count)
        };
        prop_assert_eq!(cfg.validate().is_ok(), offset < worker_count);
    }

    /// The loop always stops at the cap, whatever the norm.
    #[test]
    fn stop_at_cap(cap in 1usize..500, norm in 0.0f64..1e6) {
        let cfg = SolverConfig { max_iterations: cap, ..SolverConfig::default() };
        prop_assert!(cfg.should_stop(cap, norm));
    }

    /// IterationState counts every recorded round.
    #[test]
    fn state_counts_rounds(norms in proptest::collection::vec(0.0f64..100.0, 1..50)) {
        let mut state = IterationState::new();
        for n in &norms {
            state.record(n * n, *n, 0.01);
        }
        prop_assert_eq!(state.iteration_count, norms.len());
        prop_assert_eq!(state.converged, *norms.last().expect("non-empty") <= 0.01);
    }
}
