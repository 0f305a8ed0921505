// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Convergence Reduction
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::comm::Communicator;
use crate::tile::GhostedTile;
use jacobi_types::error::{JacobiError, JacobiResult};
use ndarray::Array2;

/// This worker's contribution: squared change over its owned interior rows.
pub fn local_diffnorm(tile: &GhostedTile, parallel: bool) -> JacobiResult<f64> {
    tile.squared_diff(parallel)
}

/// Group-wide diffnorm: square root of the summed local contributions.
/// Every rank gets the same value.
pub fn global_diffnorm<C: Communicator + ?Sized>(comm: &C, local: f64) -> JacobiResult<f64> {
    if !local.is_finite() || local < 0.0 {
        return Err(JacobiError::Comm(format!(
            "worker {} produced an invalid partial diffnorm {local}",
            comm.rank()
        )));
    }
    let total = comm.all_reduce_sum(local)?;
    Ok(total.sqrt())
}

fn check_pair(a: &Array2<f64>, b: &Array2<f64>) -> JacobiResult<()> {
    if a.dim() != b.dim() {
        return Err(JacobiError::ShapeMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    if a.iter().any(|v| !v.is_finite()) || b.iter().any(|v| !v.is_finite()) {
        return Err(JacobiError::Comm(
            "compared matrices must be finite".to_string(),
        ));
    }
    Ok(())
}

/// Largest elementwise `|a - b|`.
pub fn max_abs_delta(a: &Array2<f64>, b: &Array2<f64>) -> JacobiResult<f64> {
    check_pair(a, b)?;
    Ok(a.iter()
        .zip(b.iter())
        .map(|(av, bv)| (av - bv).abs())
        .fold(0.0, f64::max))
}
