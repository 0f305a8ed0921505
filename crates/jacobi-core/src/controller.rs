// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Iteration Controller
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-worker state machine:
//! `Distributing → {Relaxing → Exchanging → Reducing}* → Collecting → Done`.
//!
//! Every worker runs its own controller against the same [`Communicator`]
//! group. The exit decision depends only on the reduced global norm and the
//! shared iteration count, so all workers leave the loop together.

use crate::comm::{BlockLayout, Communicator};
use crate::halo::exchange_halos;
use crate::partition::{decompose, gather_layouts, scatter_layouts, PartitionDescriptor};
use crate::reduce::{global_diffnorm, local_diffnorm};
use crate::tile::{try_alloc, GhostedTile};
use jacobi_math::matrix::render_matrix;
use jacobi_types::config::SolverConfig;
use jacobi_types::error::{JacobiError, JacobiResult};
use jacobi_types::state::IterationState;
use ndarray::Array2;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Distributing,
    Relaxing,
    Exchanging,
    Reducing,
    Collecting,
    Done,
}

/// What one worker reports once its controller reaches [`Phase::Done`].
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub rank: usize,
    pub iterations: usize,
    pub norm: f64,
    pub converged: bool,
    pub history: Vec<f64>,
    /// Time from the start of distribution to the end of collection.
    pub elapsed: Duration,
    /// Gathered solution; only the coordinator has one.
    pub matrix: Option<Array2<f64>>,
}

pub struct IterationController<'a, C: Communicator + ?Sized> {
    comm: &'a C,
    config: SolverConfig,
    descriptor: PartitionDescriptor,
    scatter: Vec<BlockLayout>,
    gather: Vec<BlockLayout>,
    /// Coordinator only: the initial matrix, later overwritten by the gather.
    global: Option<Array2<f64>>,
    tile: Option<GhostedTile>,
    state: IterationState,
    phase: Phase,
    history: Vec<f64>,
    started: Option<Instant>,
    elapsed: Duration,
}

impl<'a, C: Communicator + ?Sized> IterationController<'a, C> {
    /// Partition the `n × n` problem for this worker. The coordinator must
    /// pass the global matrix; other workers' `global` is ignored.
    pub fn new(
        comm: &'a C,
        config: &SolverConfig,
        n: usize,
        global: Option<Array2<f64>>,
    ) -> JacobiResult<Self> {
        config.validate()?;
        if comm.size() != config.worker_count {
            return Err(JacobiError::ConfigError(format!(
                "configured for {} workers but the group has {}",
                config.worker_count,
                comm.size()
            )));
        }
        let rank = comm.rank();
        let parts = decompose(n, config.worker_count)?;
        let descriptor = parts
            .get(rank)
            .cloned()
            .ok_or_else(|| JacobiError::ConfigError(format!("no partition for worker {rank}")))?;
        log::debug!(
            "[W{rank}] {:?}: rows {:?}, {} halo row(s), scatter {}@{}, gather {}@{}",
            descriptor.position,
            descriptor.global_rows(),
            descriptor.ghost_row_count,
            descriptor.send_element_count,
            descriptor.send_offset,
            descriptor.recv_element_count,
            descriptor.recv_offset
        );

        let global = if rank == config.coordinator {
            let matrix = global.ok_or_else(|| {
                JacobiError::ConfigError(format!("coordinator {rank} was given no matrix"))
            })?;
            if matrix.dim() != (n, n) {
                return Err(JacobiError::ShapeMismatch {
                    expected: n * n,
                    got: matrix.len(),
                });
            }
            Some(matrix.as_standard_layout().into_owned())
        } else {
            None
        };

        Ok(IterationController {
            comm,
            config: config.clone(),
            scatter: scatter_layouts(&parts),
            gather: gather_layouts(&parts),
            descriptor,
            global,
            tile: None,
            state: IterationState::new(),
            phase: Phase::Distributing,
            history: Vec::new(),
            started: None,
            elapsed: Duration::ZERO,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &IterationState {
        &self.state
    }

    pub fn descriptor(&self) -> &PartitionDescriptor {
        &self.descriptor
    }

    fn rank(&self) -> usize {
        self.comm.rank()
    }

    fn tile_mut(&mut self) -> JacobiResult<&mut GhostedTile> {
        let rank = self.comm.rank();
        self.tile
            .as_mut()
            .ok_or_else(|| JacobiError::Comm(format!("worker {rank} has no tile yet")))
    }

    fn distribute(&mut self) -> JacobiResult<()> {
        let mut block = try_alloc(self.descriptor.send_element_count)?;
        let root_buf = match &self.global {
            Some(matrix) => Some(matrix.as_slice().ok_or_else(|| {
                JacobiError::Comm("global matrix is not contiguous".to_string())
            })?),
            None => None,
        };
        self.comm
            .scatterv(self.config.coordinator, root_buf, &self.scatter, &mut block)?;
        let tile = GhostedTile::from_block(self.descriptor.clone(), block)?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "[W{}] received ghosted tile:\n{}",
                self.rank(),
                render_matrix(tile.current())
            );
        }
        self.tile = Some(tile);
        Ok(())
    }

    fn reduce(&mut self) -> JacobiResult<bool> {
        let parallel = self.config.local_parallelism;
        let local = {
            let tile = self.tile_mut()?;
            local_diffnorm(tile, parallel)?
        };
        let global = global_diffnorm(self.comm, local)?;
        self.state
            .record(local, global, self.config.convergence_threshold);
        if self.config.record_history {
            self.history.push(global);
        }
        if self.rank() == self.config.coordinator {
            log::debug!(
                "iteration {}: global diffnorm {global:.6e}",
                self.state.iteration_count
            );
        }
        log::trace!(
            "[W{}] iteration {}: local {local:.6e}",
            self.rank(),
            self.state.iteration_count
        );
        Ok(self
            .config
            .should_stop(self.state.iteration_count, self.state.global_diffnorm))
    }

    fn collect(&mut self) -> JacobiResult<()> {
        let rank = self.rank();
        let owned = match &self.tile {
            Some(tile) => tile.owned_block(),
            None => {
                return Err(JacobiError::Comm(format!("worker {rank} has no tile to gather")))
            }
        };
        let root_buf = match self.global.as_mut() {
            Some(matrix) => Some(matrix.as_slice_mut().ok_or_else(|| {
                JacobiError::Comm("global matrix is not contiguous".to_string())
            })?),
            None => None,
        };
        self.comm
            .gatherv(self.config.coordinator, &owned, &self.gather, root_buf)
    }

    /// Advance by one phase and return the phase entered.
    pub fn step(&mut self) -> JacobiResult<Phase> {
        let parallel = self.config.local_parallelism;
        let next = match self.phase {
            Phase::Distributing => {
                self.distribute()?;
                self.state.reset();
                self.started = Some(Instant::now());
                Phase::Relaxing
            }
            Phase::Relaxing => {
                self.tile_mut()?.relax(parallel)?;
                Phase::Exchanging
            }
            Phase::Exchanging => {
                let comm = self.comm;
                exchange_halos(self.tile_mut()?, comm)?;
                Phase::Reducing
            }
            Phase::Reducing => {
                if self.reduce()? {
                    Phase::Collecting
                } else {
                    self.tile_mut()?.swap();
                    Phase::Relaxing
                }
            }
            Phase::Collecting => {
                self.collect()?;
                self.elapsed = self.started.map(|t| t.elapsed()).unwrap_or_default();
                Phase::Done
            }
            Phase::Done => Phase::Done,
        };
        if next != self.phase {
            log::trace!("[W{}] {:?} -> {next:?}", self.rank(), self.phase);
        }
        self.phase = next;
        Ok(next)
    }

    /// Drive the state machine to [`Phase::Done`].
    pub fn run(mut self) -> JacobiResult<WorkerReport> {
        while self.step()? != Phase::Done {}
        log::info!(
            "[W{}] local calculation time: {:.3} ms",
            self.rank(),
            self.elapsed.as_secs_f64() * jacobi_types::constants::MS_IN_S
        );
        Ok(WorkerReport {
            rank: self.rank(),
            iterations: self.state.iteration_count,
            norm: self.state.global_diffnorm,
            converged: self.state.converged,
            history: self.history,
            elapsed: self.elapsed,
            matrix: self.global,
        })
    }
}

/// Run one worker to completion. Any failure other than a mirrored abort
/// aborts the whole group before being returned.
pub fn run_worker<C: Communicator + ?Sized>(
    comm: &C,
    config: &SolverConfig,
    n: usize,
    global: Option<Array2<f64>>,
) -> JacobiResult<WorkerReport> {
    let result =
        IterationController::new(comm, config, n, global).and_then(IterationController::run);
    if let Err(err) = &result {
        if !err.is_secondary() {
            comm.abort(&err.to_string());
        }
    }
    result
}
