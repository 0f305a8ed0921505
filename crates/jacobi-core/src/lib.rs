//! Row-block domain decomposition and group-synchronised Jacobi relaxation.
//!
//! Partition → (Relax → Exchange → Reduce)* → Collect, one worker per
//! thread, coordinated through the [`comm::Communicator`] primitives.

pub mod comm;
pub mod controller;
pub mod halo;
pub mod partition;
pub mod reduce;
pub mod report;
pub mod solver;
pub mod tile;
