//! Turn command-line file patterns into input paths.

use glob::glob;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Expand each pattern into existing files.
///
/// A pattern naming an existing path is used as-is. Anything else is treated
/// as a glob; matches that are not regular files are skipped, and patterns
/// that are invalid or match nothing contribute no paths.
pub fn expand_patterns<I, S>(patterns: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut files = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let path = Path::new(pattern);
        if path.exists() {
            files.push(path.to_path_buf());
            continue;
        }

        let entries = match glob(pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("invalid file pattern '{}': {}", pattern, e);
                continue;
            }
        };

        let before = files.len();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("skipping unreadable match for '{}': {}", pattern, e),
            }
        }

        if files.len() == before {
            warn!("no files match '{}'", pattern);
        }
    }

    files
}
