#![deny(unsafe_code)]

//! File-backed I/O for the transformation run: source discovery,
//! delimited readers and writers, and the persisted side-tables.

pub mod discovery;
pub mod error;
pub mod sidecar;
pub mod tsv;

pub use discovery::{discover_sources, list_input_files};
pub use error::{IngestError, Result};
pub use sidecar::{
    IDENTITY_FILE, RECORD_ID_FILE, load_identity_table, load_record_id_table,
    save_identity_table, save_record_id_table,
};
pub use tsv::{FileRowSource, TsvRowSink, delimiter_for};
