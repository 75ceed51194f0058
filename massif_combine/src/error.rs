use massif_parse::ParseError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while combining Massif files.
#[derive(Error, Debug)]
pub enum CombineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to open '{}': {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse '{}': {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("no content to write")]
    Empty,

    #[error("failed to write '{}': {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to close '{}': {}", .path.display(), .source)]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove '{}': {}", .path.display(), .source)]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CombineError {
    /// True when an input file was readable but not valid Massif output.
    pub fn is_malformed(&self) -> bool {
        matches!(self, CombineError::Parse { source, .. } if source.is_malformed())
    }
}

/// Result type for combine operations.
pub type Result<T> = std::result::Result<T, CombineError>;
