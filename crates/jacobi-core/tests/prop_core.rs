// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Property-Based Tests (proptest) for jacobi-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for jacobi-core using proptest.
//!
//! Covers: partition completeness and contiguity, scatter/gather layout
//! bounds, halo correctness against a whole-matrix sweep.

use jacobi_core::halo::serial_halo_exchange;
use jacobi_core::partition::{decompose, gather_layouts, scatter_layouts};
use jacobi_core::tile::GhostedTile;
use jacobi_math::matrix::generate_matrix;
use jacobi_math::stencil::relax_rows;
use jacobi_types::constants::{LOWER_BOUND, UPPER_BOUND};
use proptest::prelude::*;
use proptest::sample::select;

fn topology(max_factor: usize) -> impl Strategy<Value = (usize, usize)> {
    select(vec![1usize, 2, 4, 8, 16, 32])
        .prop_flat_map(move |p| (p + 1..p * max_factor + 2).prop_map(move |n| (n, p)))
}

// ── Partition Properties ─────────────────────────────────────────────

proptest! {
    /// Owned rows cover `0..n` exactly once, in rank order.
    #[test]
    fn partition_is_complete_and_contiguous((n, p) in topology(40)) {
        let parts = decompose(n, p).expect("decompose");
        prop_assert_eq!(parts.len(), p);
        let mut next_row = 0;
        for d in &parts {
            prop_assert!(d.row_count >= 1);
            prop_assert_eq!(d.first_global_row, next_row);
            next_row += d.row_count;
        }
        prop_assert_eq!(next_row, n);
    }

    /// Scatter blocks stay inside the matrix; gather blocks tile it.
    #[test]
    fn layouts_fit_matrix((n, p) in topology(40)) {
        let parts = decompose(n, p).expect("decompose");
        for block in scatter_layouts(&parts) {
            prop_assert!(block.offset + block.count <= n * n);
            prop_assert_eq!(block.count % n, 0);
        }
        let mut cursor = 0;
        for block in gather_layouts(&parts) {
            prop_assert_eq!(block.offset, cursor);
            cursor += block.count;
        }
        prop_assert_eq!(cursor, n * n);
    }

    /// Halo rows exist exactly on interior edges.
    #[test]
    fn halo_count_matches_position((n, p) in topology(10)) {
        let parts = decompose(n, p).expect("decompose");
        for d in &parts {
            let expected = usize::from(d.worker_index > 0) + usize::from(d.worker_index + 1 < p);
            prop_assert_eq!(d.ghost_row_count, expected);
            prop_assert_eq!(d.send_element_count, (d.row_count + expected) * n);
        }
    }
}

// ── Halo Properties ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// After one relax + exchange, every tile row (halo rows included)
    /// equals the corresponding row of a single sweep over the whole matrix.
    #[test]
    fn exchanged_tiles_match_whole_sweep((n, p) in topology(6), seed in 0u64..500) {
        let global = generate_matrix(n, n, LOWER_BOUND, UPPER_BOUND, seed).expect("generate");
        let mut swept = global.clone();
        relax_rows(&global, &mut swept, 1..(n - 1).max(1), false).expect("relax");

        let flat = global.as_slice().expect("standard layout");
        let parts = decompose(n, p).expect("decompose");
        let mut tiles: Vec<GhostedTile> = parts
            .iter()
            .map(|d| {
                let block = flat[d.send_offset..d.send_offset + d.send_element_count].to_vec();
                GhostedTile::from_block(d.clone(), block).expect("tile")
            })
            .collect();
        for t in tiles.iter_mut() {
            t.relax(false).expect("relax");
        }
        serial_halo_exchange(&mut tiles).expect("exchange");

        for t in &tiles {
            let first_loaded = t.descriptor().send_offset / n;
            for (i, row) in t.latest().rows().into_iter().enumerate() {
                prop_assert_eq!(row, swept.row(first_loaded + i));
            }
        }
    }
}
