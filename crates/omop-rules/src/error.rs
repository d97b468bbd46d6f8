#![deny(unsafe_code)]

/// Fatal rule-compilation failures. Any of these aborts the run before a
/// single source row is processed; data-quality problems are never errors
/// and are accounted for through metrics instead.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("malformed rules document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("malformed rule group '{key}' for target '{target}': {source}")]
    Group {
        target: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rules reference unknown target table '{0}'")]
    UnknownTargetTable(String),

    #[error("rules reference unknown column '{column}' of target table '{table}'")]
    UnknownTargetColumn { table: String, column: String },
}
