//! Combine Valgrind Massif snapshot files into one time-ordered file.
//!
//! # Usage
//!
//! ```bash
//! massif_combine 'massif.out.*'
//! massif_combine -o combined.out -v massif.out.1001 massif.out.1002
//! massif_combine -d -o all.out 'run1/massif.out.*' 'run2/massif.out.*'
//! ```
//!
//! Failures to load, write or delete individual files are reported on
//! stderr; the exit status is still 0.

use clap::Parser;
use massif_combine::inputs::expand_patterns;
use massif_combine::{CombineConfig, DEFAULT_OUTPUT};
use std::io::stderr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "massif_combine")]
#[command(about = "Combine Valgrind Massif snapshot files into one time-ordered file")]
#[command(version, arg_required_else_help = true)]
struct Args {
    /// Input files or glob patterns, e.g. 'massif.out.*'
    #[arg(value_name = "FILE-PATTERN")]
    patterns: Vec<String>,

    /// Output file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Delete the input files after combining
    #[arg(short, long)]
    delete: bool,

    /// Print per-file progress
    #[arg(short, long)]
    verbose: bool,

    /// Logging level filters, e.g., debug, info, warn, etc ...
    #[arg(short, long, default_value = "warn")]
    logging: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(EnvFilter::new(&args.logging))
        .init();

    let inputs = expand_patterns(&args.patterns);
    if inputs.is_empty() {
        warn!("no input files found");
    }

    let config = CombineConfig {
        output: args.output,
        delete_inputs: args.delete,
        verbose: args.verbose,
    };

    let report = massif_combine::run(&config, &inputs, &mut std::io::stdout());
    debug!(
        "loaded {} of {} inputs, wrote {:?} snapshots, {} delete failures",
        report.loaded.len(),
        inputs.len(),
        report.written,
        report.delete_errors.len()
    );

    ExitCode::SUCCESS
}
