// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Run Records
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One-line-per-run timing log: `"<n>,<elapsed_seconds>"`.

use jacobi_types::error::JacobiResult;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub fn format_run_record(n: usize, elapsed_secs: f64) -> String {
    format!("{n},{elapsed_secs:.6}\n")
}

/// Append a run record to `path`, creating the file if needed.
pub fn append_run_record(
    path: impl AsRef<Path>,
    n: usize,
    elapsed_secs: f64,
) -> JacobiResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;
    file.write_all(format_run_record(n, elapsed_secs).as_bytes())?;
    log::debug!("Appended run record for n={n} to {}", path.as_ref().display());
    Ok(())
}
