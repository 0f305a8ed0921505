// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Group Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Entry point: run the whole worker group in-process, one scoped thread
//! per worker, and fold the per-worker reports into a [`SolveOutcome`].

use crate::comm::{Communicator, SoloComm, ThreadComm, ThreadGroup};
use crate::controller::{run_worker, WorkerReport};
use jacobi_types::config::SolverConfig;
use jacobi_types::constants::MS_IN_S;
use jacobi_types::error::{JacobiError, JacobiResult};
use ndarray::Array2;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Relaxed matrix as gathered on the coordinator.
    pub matrix: Array2<f64>,
    pub iterations: usize,
    /// Global diffnorm of the last iteration.
    pub norm: f64,
    /// False when the iteration cap was hit first.
    pub converged: bool,
    pub worker_count: usize,
    /// Global diffnorm after every iteration; empty unless `record_history`.
    pub history: Vec<f64>,
    /// Slowest worker's time from distribution to collection.
    pub elapsed: Duration,
}

/// Solve the `n × n` system held in `matrix` with `config.worker_count`
/// cooperating workers.
///
/// Hitting `max_iterations` is not an error; check
/// [`SolveOutcome::converged`]. A worker that fails aborts the group, and
/// the first root-cause error (never a mirrored abort) is returned.
pub fn solve(matrix: &Array2<f64>, config: &SolverConfig) -> JacobiResult<SolveOutcome> {
    config.validate()?;
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(JacobiError::ConfigError(format!(
            "coefficient matrix must be square, got {rows}x{cols}"
        )));
    }
    log::info!(
        "Solving {rows}x{cols} system with {} worker(s)",
        config.worker_count
    );

    let reports = if config.worker_count == 1 {
        vec![run_worker(&SoloComm, config, rows, Some(matrix.clone()))?]
    } else {
        run_group(matrix, config)?
    };
    assemble(reports, config)
}

fn run_group(matrix: &Array2<f64>, config: &SolverConfig) -> JacobiResult<Vec<WorkerReport>> {
    let n = matrix.nrows();
    let comms = ThreadGroup::new(config.worker_count)?;
    let abort = comms
        .first()
        .map(ThreadComm::abort_handle)
        .ok_or_else(|| JacobiError::Comm("worker group is empty".to_string()))?;

    let results: Vec<JacobiResult<WorkerReport>> = thread::scope(|scope| {
        let mut pending = Vec::with_capacity(comms.len());
        for comm in comms {
            let rank = comm.rank();
            if abort.is_aborted() {
                // Peers are already unwinding; this endpoint is dropped unused.
                pending.push(Err(JacobiError::GroupAborted(format!(
                    "worker {rank} not started"
                ))));
                continue;
            }
            let global = (rank == config.coordinator).then(|| matrix.clone());
            let spawned = thread::Builder::new()
                .name(format!("jacobi-worker-{rank}"))
                .spawn_scoped(scope, move || run_worker(&comm, config, n, global));
            match spawned {
                Ok(handle) => pending.push(Ok((rank, handle))),
                Err(e) => {
                    let reason = format!("cannot spawn worker {rank}: {e}");
                    abort.abort(&reason);
                    pending.push(Err(JacobiError::Comm(reason)));
                }
            }
        }
        pending
            .into_iter()
            .map(|slot| {
                let (rank, handle) = slot?;
                handle.join().unwrap_or_else(|_| {
                    let reason = format!("worker {rank} panicked");
                    abort.abort(&reason);
                    Err(JacobiError::Comm(reason))
                })
            })
            .collect()
    });

    first_failure(results)
}

/// All reports in rank order, or the first error that is not a mirrored
/// abort. Falls back to the first error when every failure is mirrored.
fn first_failure(results: Vec<JacobiResult<WorkerReport>>) -> JacobiResult<Vec<WorkerReport>> {
    let mut reports = Vec::with_capacity(results.len());
    let mut secondary = None;
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(err) if err.is_secondary() => {
                secondary.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    match secondary {
        Some(err) => Err(err),
        None => Ok(reports),
    }
}

fn assemble(reports: Vec<WorkerReport>, config: &SolverConfig) -> JacobiResult<SolveOutcome> {
    let worker_count = reports.len();
    let elapsed = reports
        .iter()
        .map(|r| r.elapsed)
        .max()
        .unwrap_or_default();
    let coordinator = reports
        .into_iter()
        .find(|r| r.rank == config.coordinator)
        .ok_or_else(|| {
            JacobiError::Comm(format!("no report from coordinator {}", config.coordinator))
        })?;
    let matrix = coordinator.matrix.ok_or_else(|| {
        JacobiError::Comm("coordinator finished without a gathered matrix".to_string())
    })?;

    log::info!(
        "The solution took {} iterations and has an error of {:.3e} (converged: {})",
        coordinator.iterations,
        coordinator.norm,
        coordinator.converged
    );
    log::debug!("Max time: {:.3} ms", elapsed.as_secs_f64() * MS_IN_S);

    Ok(SolveOutcome {
        matrix,
        iterations: coordinator.iterations,
        norm: coordinator.norm,
        converged: coordinator.converged,
        worker_count,
        history: coordinator.history,
        elapsed,
    })
}
