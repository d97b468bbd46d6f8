//! Result types shared between command execution and summary printing.

use std::path::PathBuf;

/// Accepted/rejected counts for one target table.
pub struct TargetSummary {
    pub target: String,
    pub written: u64,
    pub rejected: u64,
}

/// Everything the run produced, for the closing summary.
pub struct RunReport {
    pub dataset: String,
    pub output_dir: PathBuf,
    pub summary_path: PathBuf,
    pub targets: Vec<TargetSummary>,
    /// Mapped source tables the compiler could not make processable.
    pub skipped: Vec<(String, String)>,
    /// Registered persons at run end, resumed entries included.
    pub persons: usize,
}
