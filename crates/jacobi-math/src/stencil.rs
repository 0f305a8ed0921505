// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Stencil Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Four-neighbour Jacobi stencil over a row band of a dense block.
//!
//! Both functions take the band of rows to touch explicitly; the caller
//! decides which rows are real (owned, not on the global boundary). Column
//! 0 and column `ncols - 1` are never written or measured.

use jacobi_types::error::{JacobiError, JacobiResult};
use ndarray::{s, Array2, ArrayViewMut1, Axis};
use rayon::prelude::*;
use std::ops::Range;

fn check_band(current: &Array2<f64>, next: &Array2<f64>, rows: &Range<usize>) -> JacobiResult<()> {
    if current.dim() != next.dim() {
        return Err(JacobiError::ShapeMismatch {
            expected: current.len(),
            got: next.len(),
        });
    }
    if rows.is_empty() {
        return Ok(());
    }
    if rows.start == 0 || rows.end >= current.nrows() {
        return Err(JacobiError::ConfigError(format!(
            "Row band {}..{} needs a neighbour row on both sides (block has {} rows)",
            rows.start,
            rows.end,
            current.nrows()
        )));
    }
    Ok(())
}

/// One Jacobi sweep: `next[i][j] = (cur[i+1][j] + cur[i-1][j] + cur[i][j+1] + cur[i][j-1]) / 4`
/// for every `i` in `rows` and `j` in `1..ncols-1`.
///
/// `current` is only read, so rows can be processed in parallel when
/// `parallel` is set.
pub fn relax_rows(
    current: &Array2<f64>,
    next: &mut Array2<f64>,
    rows: Range<usize>,
    parallel: bool,
) -> JacobiResult<()> {
    check_band(current, next, &rows)?;
    let ncols = current.ncols();
    if rows.is_empty() || ncols < 3 {
        return Ok(());
    }

    let update = |i: usize, mut out: ArrayViewMut1<f64>| {
        let up = current.row(i - 1);
        let mid = current.row(i);
        let down = current.row(i + 1);
        for j in 1..ncols - 1 {
            out[j] = (down[j] + up[j] + mid[j + 1] + mid[j - 1]) / 4.0;
        }
    };

    let start = rows.start;
    let mut band = next.slice_mut(s![rows, ..]);
    if parallel {
        band.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(k, out)| update(start + k, out));
    } else {
        for (k, out) in band.axis_iter_mut(Axis(0)).enumerate() {
            update(start + k, out);
        }
    }
    Ok(())
}

/// Sum of squared differences between `current` and `next` over `rows`
/// and interior columns. Not square-rooted: partial sums from several
/// blocks are added before the root is taken.
pub fn squared_diff(
    current: &Array2<f64>,
    next: &Array2<f64>,
    rows: Range<usize>,
    parallel: bool,
) -> JacobiResult<f64> {
    check_band(current, next, &rows)?;
    let ncols = current.ncols();
    if rows.is_empty() || ncols < 3 {
        return Ok(0.0);
    }

    let row_sum = |i: usize| -> f64 {
        let a = current.row(i);
        let b = next.row(i);
        (1..ncols - 1)
            .map(|j| {
                let d = b[j] - a[j];
                d * d
            })
            .sum()
    };

    let total: f64 = if parallel {
        rows.into_par_iter().map(row_sum).sum()
    } else {
        rows.map(row_sum).sum()
    };
    Ok(total)
}
