use crate::error::CombineError;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error};

/// Remove input files once they have been combined.
///
/// Every path is attempted; failures are logged and returned rather than
/// stopping the loop. With `verbose` set, each deletion is announced on `out`.
pub fn delete_inputs<W: Write>(
    paths: &[PathBuf],
    verbose: bool,
    out: &mut W,
) -> Vec<CombineError> {
    let mut errors = Vec::new();

    for path in paths {
        if verbose {
            let _ = writeln!(out, "Deleting file {}", path.display());
        }

        match fs::remove_file(path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(source) => {
                let err = CombineError::Delete {
                    path: path.clone(),
                    source,
                };
                error!("{}", err);
                errors.push(err);
            }
        }
    }

    errors
}
