// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Serial Reference Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Whole-matrix Jacobi relaxation on one thread of control.
//!
//! Same kernel, same stopping rule and same buffer swapping as the
//! distributed loop, without any partitioning. The distributed solver is
//! checked against this one.

use crate::stencil::{relax_rows, squared_diff};
use jacobi_types::config::SolverConfig;
use jacobi_types::error::JacobiResult;
use ndarray::Array2;

#[derive(Debug, Clone)]
pub struct SerialOutcome {
    pub iterations: usize,
    /// Diffnorm of the last iteration.
    pub norm: f64,
    pub converged: bool,
    /// Diffnorm after every iteration.
    pub history: Vec<f64>,
}

/// Relax `matrix` in place until the diffnorm drops to the configured
/// threshold or the iteration cap is hit. Boundary rows and columns keep
/// their initial values.
pub fn jacobi_serial(matrix: &mut Array2<f64>, cfg: &SolverConfig) -> JacobiResult<SerialOutcome> {
    cfg.validate()?;
    let nrows = matrix.nrows();
    let band = 1..nrows.saturating_sub(1).max(1);

    let mut next = matrix.clone();
    let mut history = Vec::new();
    let mut iterations = 0usize;
    let mut norm;
    loop {
        relax_rows(matrix, &mut next, band.clone(), cfg.local_parallelism)?;
        iterations += 1;
        norm = squared_diff(matrix, &next, band.clone(), cfg.local_parallelism)?.sqrt();
        std::mem::swap(matrix, &mut next);
        if cfg.record_history {
            history.push(norm);
        }
        log::trace!("serial iteration {iterations}: diffnorm {norm:.3e}");
        if cfg.should_stop(iterations, norm) {
            break;
        }
    }

    Ok(SerialOutcome {
        iterations,
        norm,
        converged: norm <= cfg.convergence_threshold,
        history,
    })
}
