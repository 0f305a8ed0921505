// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Iteration cap applied when no configuration overrides it.
pub const MAX_ITERATIONS: usize = 100;

/// Global diffnorm at or below which the relaxation is considered converged.
pub const CONVERGENCE_THRESHOLD: f64 = 0.01;

/// Rank that owns the global matrix outside the relaxation loop.
pub const COORDINATOR: usize = 0;

/// Default size of the worker group.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Lower bound for generated matrix values.
pub const LOWER_BOUND: f64 = 0.0;

/// Upper bound for generated matrix values.
pub const UPPER_BOUND: f64 = 99.9;

/// Seed used by the generator when none is given.
pub const SEED: u64 = 1;

/// Matrices with more elements than this are not rendered.
pub const PRINT_MAX_ELEMENTS: usize = 100;

/// Matrices with a dimension above this are not rendered.
pub const PRINT_MAX_DIM: usize = 50;

/// Milliseconds in a second
pub const MS_IN_S: f64 = 1e3;

/// Result file used by the binary when none is given.
pub const DEFAULT_RESULT_FILE: &str = "results.csv";
