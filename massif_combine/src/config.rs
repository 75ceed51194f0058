use std::path::PathBuf;

/// Output path used when none is given.
pub const DEFAULT_OUTPUT: &str = "massif.out.combine";

/// Settings for one combine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineConfig {
    /// Where the combined file is written.
    pub output: PathBuf,
    /// Remove the inputs that were loaded once the output is written.
    pub delete_inputs: bool,
    /// Report per-file progress.
    pub verbose: bool,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            delete_inputs: false,
            verbose: false,
        }
    }
}
