// ─────────────────────────────────────────────────────────────────────
// Jacobi Halo — Command-Line Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use clap::Parser;
use jacobi_core::report::append_run_record;
use jacobi_core::solver::{solve, SolveOutcome};
use jacobi_math::matrix::{generate_diagonally_dominant, generate_matrix, render_matrix};
use jacobi_types::config::SolverConfig;
use jacobi_types::constants::{DEFAULT_RESULT_FILE, LOWER_BOUND, MS_IN_S, SEED, UPPER_BOUND};
use jacobi_types::error::JacobiResult;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};
use std::process::ExitCode;

/// Relax a random `n × n` matrix with a group of cooperating workers and
/// append the elapsed time to a result file.
#[derive(Parser, Debug)]
#[command(name = "jacobi", version, about, long_about = None)]
struct Args {
    /// Order of the square matrix.
    matrix_order: usize,

    /// File the "<n>,<seconds>" record is appended to.
    #[arg(default_value = DEFAULT_RESULT_FILE)]
    output_file: String,

    /// Non-zero enables trace logging and matrix printing.
    #[arg(default_value_t = 0)]
    debug_flag: u8,

    /// Number of workers (power of two). Overrides the config file.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seed for the matrix generator.
    #[arg(long, default_value_t = SEED)]
    seed: u64,

    /// Square the diagonal of the generated matrix.
    #[arg(long)]
    dominant: bool,

    /// JSON solver configuration; missing keys take their defaults.
    #[arg(long)]
    config: Option<String>,

    /// Fan each worker's stencil sweep out over rayon.
    #[arg(long)]
    parallel: bool,
}

impl Args {
    fn debug(&self) -> bool {
        self.debug_flag != 0
    }

    fn solver_config(&self) -> JacobiResult<SolverConfig> {
        let mut cfg = match &self.config {
            Some(path) => SolverConfig::from_file(path)?,
            None => SolverConfig::default(),
        };
        if let Some(workers) = self.workers {
            cfg.worker_count = workers;
        }
        if self.parallel {
            cfg.local_parallelism = true;
        }
        Ok(cfg)
    }
}

fn print_matrix(title: &str, matrix: &ndarray::Array2<f64>) {
    println!("{title}:\n{}\n", render_matrix(matrix));
}

fn report(args: &Args, cfg: &SolverConfig, out: &SolveOutcome) {
    println!(
        "The solution took {} iterations and has an error of {:.3e}.",
        out.iterations, out.norm
    );
    if !out.converged {
        log::warn!(
            "Iteration cap of {} reached before the diffnorm fell to {}",
            cfg.max_iterations,
            cfg.convergence_threshold
        );
    }
    println!(
        "Max time over {} worker(s): {:.3} ms",
        out.worker_count,
        out.elapsed.as_secs_f64() * MS_IN_S
    );
    if args.debug() {
        print_matrix("Relaxed matrix", &out.matrix);
    }
}

fn run(args: &Args) -> JacobiResult<()> {
    let cfg = args.solver_config()?;
    let n = args.matrix_order;
    let matrix = if args.dominant {
        generate_diagonally_dominant(n, LOWER_BOUND, UPPER_BOUND, args.seed)?
    } else {
        generate_matrix(n, n, LOWER_BOUND, UPPER_BOUND, args.seed)?
    };
    if args.debug() {
        print_matrix("Initial matrix", &matrix);
    }

    let out = solve(&matrix, &cfg)?;
    report(args, &cfg, &out);
    append_run_record(&args.output_file, n, out.elapsed.as_secs_f64())?;
    log::info!("Run record appended to {}", args.output_file);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.debug() {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    if let Err(e) = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]) {
        eprintln!("logger already initialised: {e}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_defaults() {
        let args = Args::try_parse_from(["jacobi", "16"]).expect("parse");
        assert_eq!(args.matrix_order, 16);
        assert_eq!(args.output_file, DEFAULT_RESULT_FILE);
        assert!(!args.debug());
        let cfg = args.solver_config().expect("config");
        assert_eq!(cfg, SolverConfig::default());
    }

    #[test]
    fn test_missing_order_is_usage_error() {
        assert!(Args::try_parse_from(["jacobi"]).is_err());
    }

    #[test]
    fn test_options_override_config() {
        let args = Args::try_parse_from(["jacobi", "32", "out.csv", "1", "-w", "4", "--parallel"])
            .expect("parse");
        assert!(args.debug());
        assert_eq!(args.output_file, "out.csv");
        let cfg = args.solver_config().expect("config");
        assert_eq!(cfg.worker_count, 4);
        assert!(cfg.local_parallelism);
    }
}
