//! tormenta CLI
//!
//! Multiplies two matrix files on a fixed number of threads and prints the
//! result matrix, its element sum and its Frobenius norm.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tormenta::config::parse_thread_count;
use tormenta::format::{render_report, ReportSummary};
use tormenta::{Engine, EngineConfig, MatrixSource, TormentaError};

#[derive(Parser)]
#[command(name = "tormenta")]
#[command(author, version, about = "Fork-join parallel dense matrix multiplication")]
#[command(long_about = "
Computes C = A × B on 1 to 32 worker threads and reports the sum of all
entries of C and its Frobenius norm.

Each matrix file holds a `rows cols` header followed by rows * cols
whitespace-separated values in row-major order.

Logging goes to stderr and is controlled with RUST_LOG (default: tormenta=warn).
")]
struct Cli {
    /// Left operand matrix file
    #[arg(value_name = "MATRIX_A")]
    a: PathBuf,

    /// Right operand matrix file
    #[arg(value_name = "MATRIX_B")]
    b: PathBuf,

    /// Number of worker threads (1-32)
    #[arg(value_name = "THREADS", allow_hyphen_values = true, allow_negative_numbers = true)]
    threads: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tormenta=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), TormentaError> {
    let threads = parse_thread_count(&cli.threads)?;
    let mut engine = Engine::new(EngineConfig::new(threads)?);

    let (_operands, product) = engine.run(&MatrixSource::file(cli.a), &MatrixSource::file(cli.b))?;

    if cli.json {
        let summary = ReportSummary::from(&product);
        let json = summary
            .to_json()
            .map_err(|e| TormentaError::Format(format!("cannot serialize report: {e}")))?;
        println!("{json}");
    } else {
        print!("{}", render_report(&product));
    }

    Ok(())
}
