// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Matrix Utilities
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Dense test-matrix generation and small-matrix rendering.

use jacobi_types::constants::{PRINT_MAX_DIM, PRINT_MAX_ELEMENTS};
use jacobi_types::error::{JacobiError, JacobiResult};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write;

fn check_bounds(lower: f64, upper: f64) -> JacobiResult<()> {
    if !lower.is_finite() || !upper.is_finite() || lower > upper {
        return Err(JacobiError::ConfigError(format!(
            "Invalid value range [{lower}, {upper}]"
        )));
    }
    Ok(())
}

/// Row-major matrix of values drawn uniformly from `[lower, upper]`.
/// The same seed always yields the same matrix.
pub fn generate_matrix(
    rows: usize,
    cols: usize,
    lower: f64,
    upper: f64,
    seed: u64,
) -> JacobiResult<Array2<f64>> {
    check_bounds(lower, upper)?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(Array2::from_shape_simple_fn((rows, cols), || {
        rng.gen_range(lower..=upper)
    }))
}

/// Like [`generate_matrix`], but every diagonal entry is squared so the
/// diagonal dominates its row for the default value range.
pub fn generate_diagonally_dominant(
    n: usize,
    lower: f64,
    upper: f64,
    seed: u64,
) -> JacobiResult<Array2<f64>> {
    let mut a = generate_matrix(n, n, lower, upper, seed)?;
    for d in a.diag_mut() {
        *d *= *d;
    }
    Ok(a)
}

/// Whether a matrix of this shape is small enough to print.
pub fn is_renderable(rows: usize, cols: usize) -> bool {
    rows.max(cols) <= PRINT_MAX_DIM && rows * cols <= PRINT_MAX_ELEMENTS
}

/// Tab-separated rendering with three decimals, or a one-line notice for
/// anything larger than 100 elements or wider/taller than 50.
pub fn render_matrix(a: &Array2<f64>) -> String {
    let (rows, cols) = a.dim();
    let mut out = String::new();
    if !is_renderable(rows, cols) {
        let _ = writeln!(out, "\tToo large to represent ({} elements)!", rows * cols);
        return out;
    }
    for row in a.rows() {
        for v in row.iter() {
            let _ = write!(out, "{v:8.3}\t");
        }
        out.push('\n');
    }
    out
}
