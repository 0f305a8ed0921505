// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JacobiError {
    /// Rejected topology or solver parameters. Fatal for the whole group.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Allocation error: {0}")]
    AllocationError(String),

    /// A peer aborted the group; carries the peer's reason.
    #[error("Worker group aborted: {0}")]
    GroupAborted(String),

    #[error("Communication error: {0}")]
    Comm(String),

    #[error("Shape mismatch: expected {expected} elements, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JacobiError {
    /// True when this error only mirrors a failure that happened elsewhere.
    pub fn is_secondary(&self) -> bool {
        matches!(self, JacobiError::GroupAborted(_))
    }
}

pub type JacobiResult<T> = Result<T, JacobiError>;
