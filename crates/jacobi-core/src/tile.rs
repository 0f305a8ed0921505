// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Ghosted Tile
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! A worker's block of rows with halo rows on the interior edges, held as
//! two equally sized buffers: `current` (read by the stencil) and `next`
//! (written by the stencil, and the target of the halo exchange).

use crate::partition::PartitionDescriptor;
use jacobi_math::stencil::{relax_rows, squared_diff};
use jacobi_types::error::{JacobiError, JacobiResult};
use ndarray::{Array2, ArrayView1, ArrayViewMut1};

/// Interior edge of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Toward the lower-ranked neighbour.
    Top,
    /// Toward the higher-ranked neighbour.
    Bottom,
}

/// Reserve a zeroed buffer of `len` elements, reporting exhaustion
/// as an error instead of aborting the process.
pub fn try_alloc(len: usize) -> JacobiResult<Vec<f64>> {
    let mut buf: Vec<f64> = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        JacobiError::AllocationError(format!("cannot reserve {len} elements: {e}"))
    })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

#[derive(Debug, Clone)]
pub struct GhostedTile {
    descriptor: PartitionDescriptor,
    current: Array2<f64>,
    next: Array2<f64>,
}

impl GhostedTile {
    /// Build a tile from the block scattered to this worker. `next` starts
    /// as a copy so boundary rows and columns carry over unchanged.
    pub fn from_block(descriptor: PartitionDescriptor, block: Vec<f64>) -> JacobiResult<Self> {
        if block.len() != descriptor.send_element_count {
            return Err(JacobiError::ShapeMismatch {
                expected: descriptor.send_element_count,
                got: block.len(),
            });
        }
        let shape = (descriptor.tile_rows(), descriptor.n);
        let mut mirror = try_alloc(block.len())?;
        mirror.copy_from_slice(&block);

        let current = Array2::from_shape_vec(shape, block).map_err(|_| JacobiError::ShapeMismatch {
            expected: shape.0 * shape.1,
            got: descriptor.send_element_count,
        })?;
        let next = Array2::from_shape_vec(shape, mirror).map_err(|_| JacobiError::ShapeMismatch {
            expected: shape.0 * shape.1,
            got: descriptor.send_element_count,
        })?;
        Ok(GhostedTile {
            descriptor,
            current,
            next,
        })
    }

    pub fn descriptor(&self) -> &PartitionDescriptor {
        &self.descriptor
    }

    pub fn ncols(&self) -> usize {
        self.current.ncols()
    }

    pub fn current(&self) -> &Array2<f64> {
        &self.current
    }

    /// Buffer holding the newest values: after a relax step and until the
    /// following swap, that is `next`.
    pub fn latest(&self) -> &Array2<f64> {
        &self.next
    }

    /// One stencil sweep from `current` into `next` over the relaxable rows.
    pub fn relax(&mut self, parallel: bool) -> JacobiResult<()> {
        relax_rows(&self.current, &mut self.next, self.descriptor.relax_rows(), parallel)
    }

    /// Squared change over this tile's owned interior rows. Halo rows are
    /// never counted, so every global row contributes exactly once.
    pub fn squared_diff(&self, parallel: bool) -> JacobiResult<f64> {
        squared_diff(&self.current, &self.next, self.descriptor.relax_rows(), parallel)
    }

    fn edge_rows(&self, edge: Edge) -> Option<(usize, usize)> {
        let d = &self.descriptor;
        match edge {
            Edge::Top => d.top_halo_row().map(|halo| (d.first_real_row(), halo)),
            Edge::Bottom => d.bottom_halo_row().map(|halo| (d.last_real_row(), halo)),
        }
    }

    /// Freshly computed owned row adjacent to `edge`, as sent to the
    /// neighbour on that side.
    pub fn boundary_row(&self, edge: Edge) -> Option<ArrayView1<'_, f64>> {
        self.edge_rows(edge).map(|(real, _)| self.next.row(real))
    }

    /// Halo row on `edge` in `next`, overwritten with the neighbour's row.
    pub fn halo_row_mut(&mut self, edge: Edge) -> Option<ArrayViewMut1<'_, f64>> {
        self.edge_rows(edge).map(|(_, halo)| self.next.row_mut(halo))
    }

    /// Copy out the boundary row and borrow the halo row on `edge` together.
    pub fn edge_pair(&mut self, edge: Edge) -> Option<(Vec<f64>, ArrayViewMut1<'_, f64>)> {
        let (real, halo) = self.edge_rows(edge)?;
        let outgoing = self.next.row(real).to_vec();
        Some((outgoing, self.next.row_mut(halo)))
    }

    /// Make `next` the new `current`.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Owned rows of the latest buffer, row-major, ready for the gather.
    pub fn owned_block(&self) -> Vec<f64> {
        let first = self.descriptor.first_real_row();
        let rows = first..first + self.descriptor.row_count;
        self.next
            .slice(ndarray::s![rows, ..])
            .iter()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{decompose, describe};

    fn block_for(desc: &PartitionDescriptor) -> Vec<f64> {
        (0..desc.send_element_count)
            .map(|k| (desc.send_offset + k) as f64)
            .collect()
    }

    #[test]
    fn test_from_block_rejects_wrong_length() {
        let desc = describe(8, 2, 0).expect("describe");
        let err = GhostedTile::from_block(desc, vec![0.0; 3]).expect_err("short block");
        match err {
            JacobiError::ShapeMismatch { expected, got } => {
                assert_eq!(expected, 40);
                assert_eq!(got, 3);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_edges_follow_position() {
        let parts = decompose(12, 4).expect("decompose");
        let first = GhostedTile::from_block(parts[0].clone(), block_for(&parts[0])).expect("tile");
        assert!(first.boundary_row(Edge::Top).is_none());
        assert!(first.boundary_row(Edge::Bottom).is_some());

        let middle = GhostedTile::from_block(parts[1].clone(), block_for(&parts[1])).expect("tile");
        // Middle tile loads global rows 2..=6; first owned row is global row 3.
        let top = middle.boundary_row(Edge::Top).expect("top");
        assert_eq!(top[0], 36.0);
        let bottom = middle.boundary_row(Edge::Bottom).expect("bottom");
        assert_eq!(bottom[0], 60.0);

        let last = GhostedTile::from_block(parts[3].clone(), block_for(&parts[3])).expect("tile");
        assert!(last.boundary_row(Edge::Bottom).is_none());
    }

    #[test]
    fn test_swap_exchanges_buffers_without_copy() {
        let desc = describe(6, 2, 0).expect("describe");
        let mut tile = GhostedTile::from_block(desc.clone(), block_for(&desc)).expect("tile");
        tile.relax(false).expect("relax");
        let relaxed_ptr = tile.latest().as_ptr();
        tile.swap();
        assert_eq!(tile.current().as_ptr(), relaxed_ptr);
    }

    #[test]
    fn test_owned_block_strips_halo() {
        let parts = decompose(12, 4).expect("decompose");
        let tile = GhostedTile::from_block(parts[1].clone(), block_for(&parts[1])).expect("tile");
        let owned = tile.owned_block();
        assert_eq!(owned.len(), parts[1].recv_element_count);
        assert_eq!(owned[0], (parts[1].recv_offset) as f64);
    }

    #[test]
    fn test_relax_keeps_global_boundary_rows() {
        let parts = decompose(8, 2).expect("decompose");
        let mut tile = GhostedTile::from_block(parts[0].clone(), vec![1.0; parts[0].send_element_count])
            .expect("tile");
        tile.relax(false).expect("relax");
        // Constant field is a fixed point; nothing moves.
        assert_eq!(tile.squared_diff(false).expect("diff"), 0.0);
        assert!(tile.latest().row(0).iter().all(|&v| v == 1.0));
    }
}
