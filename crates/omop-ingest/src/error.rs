//! Ingest-side errors. All variants carry the offending path.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {path}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open {path}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to create {path}")]
    FileCreate {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed record in {path}")]
    Record {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("bad side-table entry in {path} line {line}: {message}")]
    Sidecar {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, IngestError>;
