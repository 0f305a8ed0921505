// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Worker Group Messaging
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Messaging substrate for the worker group.
//!
//! The solver only needs five collective/point-to-point primitives
//! (uneven scatter, uneven gather, sum all-reduce, paired exchange,
//! barrier) plus a group-wide abort. [`Communicator`] names them;
//! [`ThreadComm`] implements them for one thread per worker on top of
//! `crossbeam-channel`, and [`SoloComm`] is the single-worker case.

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use jacobi_types::error::{JacobiError, JacobiResult};
use std::sync::{Arc, Mutex, OnceLock};

/// One worker's block inside a flat root-owned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub count: usize,
    pub offset: usize,
}

impl BlockLayout {
    fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.count
    }
}

/// Blocking group primitives. Every call suspends until the matching
/// peers reach the same call; all of them fail fast once the group has
/// been aborted.
pub trait Communicator: Send {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn barrier(&self) -> JacobiResult<()>;

    /// Sum of `local` over all ranks, visible to every rank.
    fn all_reduce_sum(&self, local: f64) -> JacobiResult<f64>;

    /// Send `send` to `peer` and receive `peer`'s row into `recv`.
    fn sendrecv(&self, peer: usize, send: &[f64], recv: &mut [f64]) -> JacobiResult<()>;

    /// Distribute `global` (only read on `root`) so that rank `r` receives
    /// `layout[r]` into `local`.
    fn scatterv(
        &self,
        root: usize,
        global: Option<&[f64]>,
        layout: &[BlockLayout],
        local: &mut [f64],
    ) -> JacobiResult<()>;

    /// Inverse of [`Communicator::scatterv`]; `global` is only written on `root`.
    fn gatherv(
        &self,
        root: usize,
        local: &[f64],
        layout: &[BlockLayout],
        global: Option<&mut [f64]>,
    ) -> JacobiResult<()>;

    /// Abort the whole group. Idempotent; the first reason wins.
    fn abort(&self, reason: &str);
}

fn check_layout(layout: &[BlockLayout], size: usize) -> JacobiResult<()> {
    if layout.len() != size {
        return Err(JacobiError::Comm(format!(
            "layout describes {} blocks for a group of {size}",
            layout.len()
        )));
    }
    Ok(())
}

fn copy_block(dst: &mut [f64], src: &[f64]) -> JacobiResult<()> {
    if dst.len() != src.len() {
        return Err(JacobiError::ShapeMismatch {
            expected: dst.len(),
            got: src.len(),
        });
    }
    dst.copy_from_slice(src);
    Ok(())
}

fn root_block<'a>(global: &'a [f64], block: &BlockLayout) -> JacobiResult<&'a [f64]> {
    global.get(block.range()).ok_or(JacobiError::ShapeMismatch {
        expected: block.offset + block.count,
        got: global.len(),
    })
}

// ── Single worker ────────────────────────────────────────────────────

/// Group of one. Collectives degenerate to local copies.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoloComm;

impl Communicator for SoloComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> JacobiResult<()> {
        Ok(())
    }

    fn all_reduce_sum(&self, local: f64) -> JacobiResult<f64> {
        Ok(local)
    }

    fn sendrecv(&self, peer: usize, _send: &[f64], _recv: &mut [f64]) -> JacobiResult<()> {
        Err(JacobiError::Comm(format!(
            "single-worker group has no peer {peer}"
        )))
    }

    fn scatterv(
        &self,
        root: usize,
        global: Option<&[f64]>,
        layout: &[BlockLayout],
        local: &mut [f64],
    ) -> JacobiResult<()> {
        check_layout(layout, 1)?;
        let global = global.ok_or_else(|| {
            JacobiError::Comm(format!("root {root} has no buffer to scatter"))
        })?;
        copy_block(local, root_block(global, &layout[0])?)
    }

    fn gatherv(
        &self,
        root: usize,
        local: &[f64],
        layout: &[BlockLayout],
        global: Option<&mut [f64]>,
    ) -> JacobiResult<()> {
        check_layout(layout, 1)?;
        let global = global.ok_or_else(|| {
            JacobiError::Comm(format!("root {root} has no buffer to gather into"))
        })?;
        let len = global.len();
        let dst = global
            .get_mut(layout[0].range())
            .ok_or(JacobiError::ShapeMismatch {
                expected: layout[0].offset + layout[0].count,
                got: len,
            })?;
        copy_block(dst, local)
    }

    fn abort(&self, reason: &str) {
        log::error!("[W0] aborting: {reason}");
    }
}

// ── Thread group ─────────────────────────────────────────────────────

#[derive(Debug)]
enum Message {
    Block(Vec<f64>),
    Row(Vec<f64>),
    Partial(f64),
    Token,
}

impl Message {
    fn kind(&self) -> &'static str {
        match self {
            Message::Block(_) => "block",
            Message::Row(_) => "row",
            Message::Partial(_) => "partial sum",
            Message::Token => "token",
        }
    }
}

/// Broadcast-by-disconnect: the single trigger sender is dropped on abort,
/// which wakes every receiver watching it at once.
#[derive(Debug)]
struct AbortSignal {
    trigger: Mutex<Option<Sender<()>>>,
    reason: OnceLock<String>,
}

impl AbortSignal {
    fn fire(&self, reason: &str) {
        let _ = self.reason.set(reason.to_string());
        let sender = match self.trigger.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);
    }

    fn fired(&self) -> bool {
        self.reason.get().is_some()
    }

    fn reason(&self) -> String {
        self.reason
            .get()
            .cloned()
            .unwrap_or_else(|| "unknown reason".to_string())
    }
}

/// Handle that can abort a thread group from outside any worker.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    signal: Arc<AbortSignal>,
}

impl AbortHandle {
    pub fn abort(&self, reason: &str) {
        self.signal.fire(reason);
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.fired()
    }
}

/// Builds the endpoints of an in-process worker group.
pub struct ThreadGroup;

impl ThreadGroup {
    /// One endpoint per rank, wired with one unbounded channel per ordered
    /// pair of ranks. Move each endpoint into its own worker thread.
    pub fn new(size: usize) -> JacobiResult<Vec<ThreadComm>> {
        if size == 0 {
            return Err(JacobiError::ConfigError(
                "worker group must have at least one member".to_string(),
            ));
        }
        let (trigger, watch) = unbounded::<()>();
        let signal = Arc::new(AbortSignal {
            trigger: Mutex::new(Some(trigger)),
            reason: OnceLock::new(),
        });

        // senders[src][dst], receivers[dst][src]
        let mut senders: Vec<Vec<Sender<Message>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut receivers: Vec<Vec<Receiver<Message>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        for outboxes in senders.iter_mut() {
            for inboxes in receivers.iter_mut() {
                let (tx, rx) = unbounded();
                outboxes.push(tx);
                inboxes.push(rx);
            }
        }

        Ok(senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| ThreadComm {
                rank,
                size,
                outboxes,
                inboxes,
                signal: Arc::clone(&signal),
                watch: watch.clone(),
            })
            .collect())
    }
}

/// One rank of an in-process worker group.
///
/// Receives listen on the peer's channel and on the abort signal, so a
/// failed or vanished peer never leaves this rank blocked.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// Indexed by destination rank.
    outboxes: Vec<Sender<Message>>,
    /// Indexed by source rank.
    inboxes: Vec<Receiver<Message>>,
    signal: Arc<AbortSignal>,
    watch: Receiver<()>,
}

impl ThreadComm {
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            signal: Arc::clone(&self.signal),
        }
    }

    fn aborted(&self) -> JacobiError {
        JacobiError::GroupAborted(self.signal.reason())
    }

    fn peer_gone(&self, peer: usize) -> JacobiError {
        if self.signal.fired() {
            self.aborted()
        } else {
            JacobiError::Comm(format!("worker {peer} disconnected from worker {}", self.rank))
        }
    }

    fn check_peer(&self, peer: usize) -> JacobiResult<()> {
        if peer >= self.size || peer == self.rank {
            return Err(JacobiError::Comm(format!(
                "worker {} cannot address peer {peer} in a group of {}",
                self.rank, self.size
            )));
        }
        Ok(())
    }

    fn send(&self, dst: usize, msg: Message) -> JacobiResult<()> {
        if self.signal.fired() {
            return Err(self.aborted());
        }
        self.outboxes[dst]
            .send(msg)
            .map_err(|_| self.peer_gone(dst))
    }

    fn recv(&self, src: usize) -> JacobiResult<Message> {
        select! {
            recv(self.inboxes[src]) -> msg => msg.map_err(|_| self.peer_gone(src)),
            recv(self.watch) -> _ => Err(self.aborted()),
        }
    }

    fn unexpected(&self, src: usize, wanted: &str, got: &Message) -> JacobiError {
        JacobiError::Comm(format!(
            "worker {} expected a {wanted} from worker {src}, got a {}",
            self.rank,
            got.kind()
        ))
    }

    fn recv_vec(&self, src: usize, row: bool) -> JacobiResult<Vec<f64>> {
        match self.recv(src)? {
            Message::Row(v) if row => Ok(v),
            Message::Block(v) if !row => Ok(v),
            other => Err(self.unexpected(src, if row { "row" } else { "block" }, &other)),
        }
    }

    fn recv_partial(&self, src: usize) -> JacobiResult<f64> {
        match self.recv(src)? {
            Message::Partial(x) => Ok(x),
            other => Err(self.unexpected(src, "partial sum", &other)),
        }
    }

    fn recv_token(&self, src: usize) -> JacobiResult<()> {
        match self.recv(src)? {
            Message::Token => Ok(()),
            other => Err(self.unexpected(src, "token", &other)),
        }
    }
}

/// Rank that collects reduction contributions and barrier tokens.
const REDUCTION_ROOT: usize = 0;

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> JacobiResult<()> {
        if self.rank == REDUCTION_ROOT {
            for src in (0..self.size).filter(|&r| r != REDUCTION_ROOT) {
                self.recv_token(src)?;
            }
            for dst in (0..self.size).filter(|&r| r != REDUCTION_ROOT) {
                self.send(dst, Message::Token)?;
            }
            Ok(())
        } else {
            self.send(REDUCTION_ROOT, Message::Token)?;
            self.recv_token(REDUCTION_ROOT)
        }
    }

    fn all_reduce_sum(&self, local: f64) -> JacobiResult<f64> {
        if self.rank == REDUCTION_ROOT {
            // Rank order keeps the sum reproducible for a fixed group size.
            let mut total = local;
            for src in (0..self.size).filter(|&r| r != REDUCTION_ROOT) {
                total += self.recv_partial(src)?;
            }
            for dst in (0..self.size).filter(|&r| r != REDUCTION_ROOT) {
                self.send(dst, Message::Partial(total))?;
            }
            Ok(total)
        } else {
            self.send(REDUCTION_ROOT, Message::Partial(local))?;
            self.recv_partial(REDUCTION_ROOT)
        }
    }

    fn sendrecv(&self, peer: usize, send: &[f64], recv: &mut [f64]) -> JacobiResult<()> {
        self.check_peer(peer)?;
        self.send(peer, Message::Row(send.to_vec()))?;
        let row = self.recv_vec(peer, true)?;
        copy_block(recv, &row)
    }

    fn scatterv(
        &self,
        root: usize,
        global: Option<&[f64]>,
        layout: &[BlockLayout],
        local: &mut [f64],
    ) -> JacobiResult<()> {
        check_layout(layout, self.size)?;
        if self.rank != root {
            let block = self.recv_vec(root, false)?;
            return copy_block(local, &block);
        }
        let global = global.ok_or_else(|| {
            JacobiError::Comm(format!("root {root} has no buffer to scatter"))
        })?;
        for (dst, block) in layout.iter().enumerate() {
            let src = root_block(global, block)?;
            if dst == root {
                copy_block(local, src)?;
            } else {
                self.send(dst, Message::Block(src.to_vec()))?;
            }
        }
        Ok(())
    }

    fn gatherv(
        &self,
        root: usize,
        local: &[f64],
        layout: &[BlockLayout],
        global: Option<&mut [f64]>,
    ) -> JacobiResult<()> {
        check_layout(layout, self.size)?;
        if self.rank != root {
            return self.send(root, Message::Block(local.to_vec()));
        }
        let global = global.ok_or_else(|| {
            JacobiError::Comm(format!("root {root} has no buffer to gather into"))
        })?;
        let len = global.len();
        for (src, block) in layout.iter().enumerate() {
            let dst = global
                .get_mut(block.range())
                .ok_or(JacobiError::ShapeMismatch {
                    expected: block.offset + block.count,
                    got: len,
                })?;
            if src == root {
                copy_block(dst, local)?;
            } else {
                let incoming = self.recv_vec(src, false)?;
                copy_block(dst, &incoming)?;
            }
        }
        Ok(())
    }

    fn abort(&self, reason: &str) {
        if !self.signal.fired() {
            log::error!("[W{}] aborting worker group: {reason}", self.rank);
        }
        self.signal.fire(&format!("worker {}: {reason}", self.rank));
    }
}
