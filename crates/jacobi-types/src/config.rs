// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    CONVERGENCE_THRESHOLD, COORDINATOR, DEFAULT_WORKER_COUNT, MAX_ITERATIONS,
};
use crate::error::{JacobiError, JacobiResult};
use serde::{Deserialize, Serialize};

/// Immutable solver parameters handed to the group entry point.
///
/// Every field has a default, so a JSON file only needs the keys it
/// overrides:
///
/// ```json
/// { "worker_count": 4, "max_iterations": 500 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of cooperating workers. Must be a power of two.
    pub worker_count: usize,
    /// Iteration cap. Reaching it is reported, not treated as an error.
    pub max_iterations: usize,
    /// Global diffnorm at or below which the loop stops.
    pub convergence_threshold: f64,
    /// Rank that owns the global matrix for scatter and gather.
    pub coordinator: usize,
    /// Fan relaxation and the local diff out over rayon inside each worker.
    pub local_parallelism: bool,
    /// Keep the global norm of every iteration in the outcome.
    pub record_history: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            worker_count: DEFAULT_WORKER_COUNT,
            max_iterations: MAX_ITERATIONS,
            convergence_threshold: CONVERGENCE_THRESHOLD,
            coordinator: COORDINATOR,
            local_parallelism: false,
            record_history: true,
        }
    }
}

impl SolverConfig {
    pub fn with_workers(worker_count: usize) -> Self {
        SolverConfig {
            worker_count,
            ..SolverConfig::default()
        }
    }

    /// Load from a JSON file; missing keys fall back to defaults.
    pub fn from_file(path: &str) -> JacobiResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parameters that do not depend on the matrix order.
    /// Topology checks (power of two, `n != worker_count`) belong to the
    /// partitioner, which every worker runs on its own.
    pub fn validate(&self) -> JacobiResult<()> {
        if self.worker_count == 0 {
            return Err(JacobiError::ConfigError(
                "worker_count must be >= 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(JacobiError::ConfigError(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold <= 0.0 {
            return Err(JacobiError::ConfigError(format!(
                "convergence_threshold must be finite and > 0, got {}",
                self.convergence_threshold
            )));
        }
        if self.coordinator >= self.worker_count {
            return Err(JacobiError::ConfigError(format!(
                "coordinator rank {} outside worker group of size {}",
                self.coordinator, self.worker_count
            )));
        }
        Ok(())
    }

    /// Exit predicate shared by the serial and distributed loops.
    pub fn should_stop(&self, iteration_count: usize, global_norm: f64) -> bool {
        global_norm <= self.convergence_threshold || iteration_count >= self.max_iterations
    }
}
