#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse DDL {path}: {message}")]
    Ddl { path: PathBuf, message: String },

    #[error("failed to parse schema config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema config references unknown table '{table}'")]
    UnknownTable { table: String },

    #[error("schema config references unknown column '{column}' of table '{table}'")]
    UnknownColumn { table: String, column: String },
}

impl SchemaError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
