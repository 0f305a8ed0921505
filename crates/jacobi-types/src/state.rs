// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Per-worker iteration bookkeeping. Reset before the loop and
/// mutated once per iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationState {
    pub iteration_count: usize,
    /// Sum of squared differences over this worker's real rows.
    pub local_diffnorm: f64,
    /// Square root of the group-wide sum.
    pub global_diffnorm: f64,
    pub converged: bool,
}

impl Default for IterationState {
    fn default() -> Self {
        IterationState::new()
    }
}

impl IterationState {
    pub fn new() -> Self {
        IterationState {
            iteration_count: 0,
            local_diffnorm: 0.0,
            global_diffnorm: f64::INFINITY,
            converged: false,
        }
    }

    pub fn reset(&mut self) {
        *self = IterationState::new();
    }

    /// Record one completed relax/exchange/reduce round.
    pub fn record(&mut self, local_diffnorm: f64, global_diffnorm: f64, threshold: f64) {
        self.iteration_count += 1;
        self.local_diffnorm = local_diffnorm;
        self.global_diffnorm = global_diffnorm;
        self.converged = global_diffnorm <= threshold;
    }
}
