// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Domain Partitioner
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Row-wise 1-D decomposition of an `n × n` matrix over a power-of-two
//! worker group.
//!
//! Every worker calls [`describe`] / [`decompose`] itself; the result is a
//! pure function of `(n, worker_count, worker_index)` so no broadcast is
//! needed.

use crate::comm::BlockLayout;
use jacobi_types::error::{JacobiError, JacobiResult};
use std::ops::Range;

/// Where a worker's row block sits in the matrix. Decides the halo layout
/// once, so the hot loop never re-branches on the rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Single worker: the whole matrix, no halo.
    Sole,
    /// Top block: halo row below only.
    First,
    /// Interior block: halo rows above and below.
    Middle,
    /// Bottom block: halo row above only.
    Last,
}

impl Position {
    pub fn of(worker_index: usize, worker_count: usize) -> Self {
        match (worker_index, worker_count) {
            (_, 1) => Position::Sole,
            (0, _) => Position::First,
            (i, p) if i + 1 == p => Position::Last,
            _ => Position::Middle,
        }
    }

    pub fn halo_rows(self) -> usize {
        match self {
            Position::Sole => 0,
            Position::First | Position::Last => 1,
            Position::Middle => 2,
        }
    }

    pub fn has_upper_neighbor(self) -> bool {
        matches!(self, Position::Middle | Position::Last)
    }

    pub fn has_lower_neighbor(self) -> bool {
        matches!(self, Position::First | Position::Middle)
    }
}

/// Static description of one worker's block, offsets in elements of the
/// flat row-major global buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    pub worker_index: usize,
    pub worker_count: usize,
    /// Matrix order.
    pub n: usize,
    pub position: Position,
    /// Rows owned by this worker.
    pub row_count: usize,
    /// Halo rows cached from neighbours (0, 1 or 2).
    pub ghost_row_count: usize,
    /// Global index of the first owned row.
    pub first_global_row: usize,
    /// Elements scattered to this worker: owned rows plus halo rows.
    pub send_element_count: usize,
    pub send_offset: usize,
    /// Elements gathered back from this worker: owned rows only.
    pub recv_element_count: usize,
    pub recv_offset: usize,
}

impl PartitionDescriptor {
    /// Rows in the ghosted tile.
    pub fn tile_rows(&self) -> usize {
        self.row_count + self.ghost_row_count
    }

    /// Tile-local index of the first owned row.
    pub fn first_real_row(&self) -> usize {
        usize::from(self.position.has_upper_neighbor())
    }

    /// Tile-local index of the last owned row.
    pub fn last_real_row(&self) -> usize {
        self.first_real_row() + self.row_count - 1
    }

    pub fn top_halo_row(&self) -> Option<usize> {
        self.position.has_upper_neighbor().then_some(0)
    }

    pub fn bottom_halo_row(&self) -> Option<usize> {
        self.position
            .has_lower_neighbor()
            .then(|| self.tile_rows() - 1)
    }

    /// Tile-local rows the kernel updates: owned rows minus any global
    /// boundary row. The first and last tile rows are always either a halo
    /// or global row `0` / `n - 1`, so this is the open interior.
    pub fn relax_rows(&self) -> Range<usize> {
        1..self.tile_rows().saturating_sub(1).max(1)
    }

    /// Owned rows in global indexing.
    pub fn global_rows(&self) -> Range<usize> {
        self.first_global_row..self.first_global_row + self.row_count
    }

    pub fn upper_neighbor(&self) -> Option<usize> {
        self.position
            .has_upper_neighbor()
            .then(|| self.worker_index - 1)
    }

    pub fn lower_neighbor(&self) -> Option<usize> {
        self.position
            .has_lower_neighbor()
            .then(|| self.worker_index + 1)
    }

    pub fn send_layout(&self) -> BlockLayout {
        BlockLayout {
            count: self.send_element_count,
            offset: self.send_offset,
        }
    }

    pub fn recv_layout(&self) -> BlockLayout {
        BlockLayout {
            count: self.recv_element_count,
            offset: self.recv_offset,
        }
    }
}

/// Rejects worker counts that are not a power of two and `n == worker_count`.
/// `n < worker_count` is rejected as well: some worker would own nothing.
pub fn validate_topology(n: usize, worker_count: usize) -> JacobiResult<()> {
    if worker_count == 0 || !worker_count.is_power_of_two() {
        return Err(JacobiError::ConfigError(format!(
            "Number of workers must be a power of 2, got {worker_count}"
        )));
    }
    if n == 0 {
        return Err(JacobiError::ConfigError(
            "Matrix order must be >= 1".to_string(),
        ));
    }
    if n == worker_count {
        return Err(JacobiError::ConfigError(format!(
            "Matrix order must give every worker at least 2 rows ({n}/{worker_count} is 1)"
        )));
    }
    if n < worker_count {
        return Err(JacobiError::ConfigError(format!(
            "Cannot split {n} rows across {worker_count} workers"
        )));
    }
    Ok(())
}

/// Rows owned by every worker except the last: `round(n / worker_count)`,
/// half away from zero. Falls back to the floor when rounding up would
/// leave the last worker without rows (e.g. n = 6 over 4 workers).
pub fn rows_per_worker(n: usize, worker_count: usize) -> usize {
    if worker_count <= 1 {
        return n;
    }
    let rounded = (n as f64 / worker_count as f64).round() as usize;
    if rounded * (worker_count - 1) < n {
        rounded
    } else {
        n / worker_count
    }
}

/// Rows the historic remainder rule (`n mod (worker_count - 1)`) would hand
/// to the last worker. Diagnostic only: it does not make the blocks add up
/// to `n` in general (n = 16 over 4 workers gives 4 + 4 + 4 + 1).
pub fn legacy_remainder_rows(n: usize, worker_count: usize) -> Option<usize> {
    if worker_count < 2 {
        return None;
    }
    let rpp = (n as f64 / worker_count as f64).round() as usize;
    let modulo = n % (worker_count - 1);
    let mut rem = if modulo != 0 { modulo } else { rpp };
    if (rpp as f64) < n as f64 / worker_count as f64 {
        rem += 1;
    }
    Some(rem)
}

/// Descriptor for one worker.
pub fn describe(n: usize, worker_count: usize, worker_index: usize) -> JacobiResult<PartitionDescriptor> {
    validate_topology(n, worker_count)?;
    if worker_index >= worker_count {
        return Err(JacobiError::ConfigError(format!(
            "Worker index {worker_index} outside group of size {worker_count}"
        )));
    }

    let position = Position::of(worker_index, worker_count);
    let rpp = rows_per_worker(n, worker_count);
    let last_rows = n - rpp * (worker_count - 1);
    let row_count = if position == Position::Last { last_rows } else { rpp };
    let first_global_row = rpp * worker_index;
    let ghost_row_count = position.halo_rows();
    let first_loaded_row = first_global_row - usize::from(position.has_upper_neighbor());

    Ok(PartitionDescriptor {
        worker_index,
        worker_count,
        n,
        position,
        row_count,
        ghost_row_count,
        first_global_row,
        send_element_count: (row_count + ghost_row_count) * n,
        send_offset: first_loaded_row * n,
        recv_element_count: row_count * n,
        recv_offset: first_global_row * n,
    })
}

/// Descriptors for the whole group, in rank order.
pub fn decompose(n: usize, worker_count: usize) -> JacobiResult<Vec<PartitionDescriptor>> {
    validate_topology(n, worker_count)?;
    let parts = (0..worker_count)
        .map(|i| describe(n, worker_count, i))
        .collect::<JacobiResult<Vec<_>>>()?;

    if let (Some(legacy), Some(last)) = (legacy_remainder_rows(n, worker_count), parts.last()) {
        if legacy != last.row_count {
            log::debug!(
                "{n} mod ({worker_count} - 1) rule would give the last worker {legacy} rows \
                 (blocks would cover {} of {n}); assigning {} instead",
                rows_per_worker(n, worker_count) * (worker_count - 1) + legacy,
                last.row_count
            );
        }
    }
    Ok(parts)
}

pub fn scatter_layouts(parts: &[PartitionDescriptor]) -> Vec<BlockLayout> {
    parts.iter().map(PartitionDescriptor::send_layout).collect()
}

pub fn gather_layouts(parts: &[PartitionDescriptor]) -> Vec<BlockLayout> {
    parts.iter().map(PartitionDescriptor::recv_layout).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_halo_layout() {
        assert_eq!(Position::of(0, 1), Position::Sole);
        assert_eq!(Position::of(0, 4), Position::First);
        assert_eq!(Position::of(2, 4), Position::Middle);
        assert_eq!(Position::of(3, 4), Position::Last);
        assert_eq!(Position::Sole.halo_rows(), 0);
        assert_eq!(Position::First.halo_rows(), 1);
        assert_eq!(Position::Middle.halo_rows(), 2);
        assert_eq!(Position::Last.halo_rows(), 1);
        assert!(!Position::First.has_upper_neighbor());
        assert!(!Position::Last.has_lower_neighbor());
    }

    #[test]
    fn test_decompose_covers_domain() {
        let parts = decompose(17, 4).expect("decomposition must succeed");
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].first_global_row, 0);
        let last = parts.last().expect("descriptor expected");
        assert_eq!(last.first_global_row + last.row_count, 17);
        let covered: usize = parts.iter().map(|p| p.row_count).sum();
        assert_eq!(covered, 17);
        for w in parts.windows(2) {
            assert_eq!(w[0].global_rows().end, w[1].global_rows().start);
        }
    }

    #[test]
    fn test_remainder_goes_to_last_worker() {
        // round(10 / 4) = 3 → 3 + 3 + 3 + 1
        let parts = decompose(10, 4).expect("decompose");
        let rows: Vec<usize> = parts.iter().map(|p| p.row_count).collect();
        assert_eq!(rows, vec![3, 3, 3, 1]);

        // round(6 / 4) = 2 would starve the last worker; floor gives 1 + 1 + 1 + 3
        let parts = decompose(6, 4).expect("decompose");
        let rows: Vec<usize> = parts.iter().map(|p| p.row_count).collect();
        assert_eq!(rows, vec![1, 1, 1, 3]);
    }

    #[test]
    fn test_offsets_match_ghosted_layout() {
        let n = 12;
        let parts = decompose(n, 4).expect("decompose");
        // First: rows 0..3 plus halo row 3
        assert_eq!(parts[0].send_offset, 0);
        assert_eq!(parts[0].send_element_count, 4 * n);
        // Middle: halo row 2, rows 3..6, halo row 6
        assert_eq!(parts[1].send_offset, 2 * n);
        assert_eq!(parts[1].send_element_count, 5 * n);
        assert_eq!(parts[1].recv_offset, 3 * n);
        assert_eq!(parts[1].recv_element_count, 3 * n);
        // Last: halo row 8, rows 9..12
        assert_eq!(parts[3].send_offset, 8 * n);
        assert_eq!(parts[3].send_element_count, 4 * n);
        assert_eq!(parts[3].top_halo_row(), Some(0));
        assert_eq!(parts[3].bottom_halo_row(), None);
        assert_eq!(parts[0].bottom_halo_row(), Some(3));
        assert_eq!(parts[1].first_real_row(), 1);
        assert_eq!(parts[1].last_real_row(), 3);
    }

    #[test]
    fn test_relax_rows_skip_halo_and_global_boundary() {
        let parts = decompose(12, 4).expect("decompose");
        assert_eq!(parts[0].relax_rows(), 1..3); // global row 0 excluded
        assert_eq!(parts[1].relax_rows(), 1..4); // all owned rows
        assert_eq!(parts[3].relax_rows(), 1..3); // global row 11 excluded

        let solo = describe(5, 1, 0).expect("solo");
        assert_eq!(solo.relax_rows(), 1..4);
        assert_eq!(solo.tile_rows(), 5);
        assert_eq!(solo.upper_neighbor(), None);
        assert_eq!(solo.lower_neighbor(), None);
    }

    #[test]
    fn test_rejects_invalid_topologies() {
        let err = decompose(8, 8).expect_err("n == worker_count must fail");
        match err {
            JacobiError::ConfigError(msg) => assert!(msg.contains("at least 2 rows")),
            other => panic!("Unexpected error: {other:?}"),
        }
        let err = decompose(16, 3).expect_err("3 workers must fail");
        match err {
            JacobiError::ConfigError(msg) => assert!(msg.contains("power of 2")),
            other => panic!("Unexpected error: {other:?}"),
        }
        assert!(decompose(16, 0).is_err());
        assert!(decompose(3, 4).is_err());
        assert!(describe(16, 4, 4).is_err());
    }

    #[test]
    fn test_legacy_remainder_is_incomplete() {
        assert_eq!(legacy_remainder_rows(16, 4), Some(1));
        assert_eq!(legacy_remainder_rows(10, 4), Some(1));
        assert_eq!(legacy_remainder_rows(5, 1), None);
        let parts = decompose(16, 4).expect("decompose");
        assert_eq!(parts[3].row_count, 4);
    }
}
