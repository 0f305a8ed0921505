// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Halo Exchange
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Halo refresh between vertically adjacent tiles.
//!
//! After each relax step a worker sends its freshly computed edge rows to
//! its neighbours and overwrites its halo rows in `next` with theirs, so
//! that after the swap the stencil reads values from the same iteration.

use crate::comm::Communicator;
use crate::tile::{Edge, GhostedTile};
use jacobi_types::error::{JacobiError, JacobiResult};
use ndarray::aview1;

fn exchange_edge<C: Communicator + ?Sized>(
    tile: &mut GhostedTile,
    comm: &C,
    edge: Edge,
    peer: usize,
) -> JacobiResult<()> {
    let ncols = tile.ncols();
    let Some((outgoing, mut halo)) = tile.edge_pair(edge) else {
        return Err(JacobiError::Comm(format!(
            "worker {} has no {edge:?} halo to share with worker {peer}",
            comm.rank()
        )));
    };
    let mut incoming = vec![0.0; ncols];
    comm.sendrecv(peer, &outgoing, &mut incoming)?;
    halo.assign(&aview1(&incoming));
    Ok(())
}

/// Barrier, then paired exchange with the upper neighbour, then with the
/// lower neighbour. Workers without a neighbour on a side skip that side.
pub fn exchange_halos<C: Communicator + ?Sized>(
    tile: &mut GhostedTile,
    comm: &C,
) -> JacobiResult<()> {
    comm.barrier()?;
    let (upper, lower) = {
        let d = tile.descriptor();
        (d.upper_neighbor(), d.lower_neighbor())
    };
    if let Some(peer) = upper {
        exchange_edge(tile, comm, Edge::Top, peer)?;
        log::trace!("[W{}] halo refreshed from worker {peer}", comm.rank());
    }
    if let Some(peer) = lower {
        exchange_edge(tile, comm, Edge::Bottom, peer)?;
        log::trace!("[W{}] halo refreshed from worker {peer}", comm.rank());
    }
    Ok(())
}

/// In-process exchange across a full set of tiles ordered by rank.
/// Same effect as every worker calling [`exchange_halos`].
pub fn serial_halo_exchange(tiles: &mut [GhostedTile]) -> JacobiResult<()> {
    for i in 1..tiles.len() {
        let (head, tail) = tiles.split_at_mut(i);
        let upper = &mut head[i - 1];
        let lower = &mut tail[0];
        if upper.ncols() != lower.ncols() {
            return Err(JacobiError::ShapeMismatch {
                expected: upper.ncols(),
                got: lower.ncols(),
            });
        }

        let down = upper
            .boundary_row(Edge::Bottom)
            .map(|row| row.to_owned())
            .ok_or_else(|| JacobiError::Comm(format!("tile {} has no bottom edge", i - 1)))?;
        let up = lower
            .boundary_row(Edge::Top)
            .map(|row| row.to_owned())
            .ok_or_else(|| JacobiError::Comm(format!("tile {i} has no top edge")))?;

        if let Some(mut halo) = lower.halo_row_mut(Edge::Top) {
            halo.assign(&down);
        }
        if let Some(mut halo) = upper.halo_row_mut(Edge::Bottom) {
            halo.assign(&up);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{SoloComm, ThreadGroup};
    use crate::partition::decompose;
    use std::thread;

    fn tiles(n: usize, p: usize) -> Vec<GhostedTile> {
        decompose(n, p)
            .expect("decompose")
            .into_iter()
            .map(|d| {
                let block: Vec<f64> = (0..d.send_element_count)
                    .map(|k| ((d.send_offset + k) % 97) as f64)
                    .collect();
                GhostedTile::from_block(d, block).expect("tile")
            })
            .collect()
    }

    fn assert_halos_match(tiles: &[GhostedTile]) {
        for pair in tiles.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let a_last = a.descriptor().last_real_row();
            let a_halo = a.descriptor().bottom_halo_row().expect("bottom halo");
            let b_first = b.descriptor().first_real_row();
            let b_halo = b.descriptor().top_halo_row().expect("top halo");
            assert_eq!(a.latest().row(a_halo), b.latest().row(b_first));
            assert_eq!(b.latest().row(b_halo), a.latest().row(a_last));
        }
    }

    #[test]
    fn test_serial_exchange_matches_neighbours() {
        let mut tiles = tiles(16, 4);
        for t in tiles.iter_mut() {
            t.relax(false).expect("relax");
        }
        serial_halo_exchange(&mut tiles).expect("exchange");
        assert_halos_match(&tiles);
    }

    #[test]
    fn test_threaded_exchange_matches_serial() {
        let mut expected = tiles(17, 4);
        for t in expected.iter_mut() {
            t.relax(false).expect("relax");
        }
        serial_halo_exchange(&mut expected).expect("exchange");

        let comms = ThreadGroup::new(4).expect("group");
        let mut got = tiles(17, 4);
        thread::scope(|scope| {
            for (tile, comm) in got.iter_mut().zip(comms) {
                scope.spawn(move || {
                    tile.relax(false).expect("relax");
                    exchange_halos(tile, &comm).expect("exchange");
                });
            }
        });
        for (g, e) in got.iter().zip(&expected) {
            assert_eq!(g.latest(), e.latest());
        }
        assert_halos_match(&got);
    }

    #[test]
    fn test_single_tile_has_nothing_to_exchange() {
        let mut single = tiles(5, 1);
        let before = single[0].latest().clone();
        exchange_halos(&mut single[0], &SoloComm).expect("exchange");
        assert_eq!(single[0].latest(), &before);
    }
}
