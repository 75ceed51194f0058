//! Combine Valgrind Massif output files.
//!
//! Profiling one process with several monitor-triggered snapshots leaves one
//! Massif file per snapshot. This crate merges such files into a single file
//! that looks like one continuous run: one header, snapshots ordered by time
//! and numbered from 0.
//!
//! # Modules
//!
//! - [`combine`] - the [`MassifFile`] accumulator and writer
//! - [`inputs`] - expansion of file patterns into input paths
//! - [`cleanup`] - removal of inputs after a successful combine
//! - [`config`] - run settings
//!
//! # Example
//!
//! ```no_run
//! use massif_combine::MassifFile;
//!
//! let mut massif = MassifFile::new();
//! massif.add("massif.out.1001").unwrap();
//! massif.add("massif.out.1002").unwrap();
//! massif.write("massif.out.combine").unwrap();
//! ```

pub mod cleanup;
pub mod combine;
pub mod config;
pub mod error;
pub mod inputs;

pub use combine::MassifFile;
pub use config::{CombineConfig, DEFAULT_OUTPUT};
pub use error::{CombineError, Result};

// Re-export massif_parse for convenience
pub use massif_parse;

use std::io::Write;
use std::path::PathBuf;
use tracing::{error, warn};

/// Outcome of [`run`].
#[derive(Debug, Default)]
pub struct RunReport {
    /// Inputs that were added without error.
    pub loaded: Vec<PathBuf>,
    /// One error per input that failed to load, fully or partly.
    pub add_errors: Vec<CombineError>,
    /// Number of snapshots written, if the write succeeded.
    pub written: Option<usize>,
    /// Why the combined file was not written, if it was not.
    pub write_error: Option<CombineError>,
    /// Files that could not be removed.
    pub delete_errors: Vec<CombineError>,
}

/// Combine `inputs` into `config.output`.
///
/// Every input is attempted even if earlier ones fail. Inputs are removed
/// only when `config.delete_inputs` is set and the write succeeded, and only
/// those that loaded cleanly. Verbose progress goes to `out`; failures are
/// logged and collected in the report.
pub fn run<W: Write>(config: &CombineConfig, inputs: &[PathBuf], out: &mut W) -> RunReport {
    let mut massif = MassifFile::new();
    let mut report = RunReport::default();

    for input in inputs {
        if let Err(err) = massif.add(input) {
            error!("{}", err);
            report.add_errors.push(err);
        }
        if config.verbose {
            let _ = writeln!(
                out,
                "Input: {}  Size: {}",
                input.display(),
                massif.snapshot_count()
            );
        }
    }
    report.loaded = massif.sources().to_vec();

    match massif.write(&config.output) {
        Ok(count) => report.written = Some(count),
        Err(CombineError::Empty) => {
            warn!("no content, nothing written");
            report.write_error = Some(CombineError::Empty);
            return report;
        }
        Err(err) => {
            error!("{}", err);
            report.write_error = Some(err);
            return report;
        }
    }

    if config.delete_inputs {
        report.delete_errors = cleanup::delete_inputs(massif.sources(), config.verbose, out);
    }

    report
}
