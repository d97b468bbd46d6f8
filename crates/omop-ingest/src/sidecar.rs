//! Side-tables persisted next to the outputs so interrupted or resumed
//! runs keep pseudonymisation and id allocation stable.
//!
//! The identity table maps raw person identifiers to their surrogates and
//! carries a fixed two-column header. The record-id table is headerless:
//! one `table<TAB>last_used_id` line per target table.

use std::path::Path;

use tracing::debug;

use crate::error::{IngestError, Result};

pub const IDENTITY_FILE: &str = "person_ids.tsv";
pub const RECORD_ID_FILE: &str = "record_ids.tsv";
const IDENTITY_HEADER: [&str; 2] = ["SOURCE_SUBJECT", "TARGET_SUBJECT"];

/// Load persisted identity entries. An absent file is an empty table.
pub fn load_identity_table(path: &Path) -> Result<Vec<(String, String)>> {
    if !path.is_file() {
        debug!(path = %path.display(), "no identity side-table; starting empty");
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|source| IngestError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| IngestError::Record {
            path: path.to_path_buf(),
            source,
        })?;
        let line = index + 2;
        let (Some(raw), Some(surrogate)) = (record.get(0), record.get(1)) else {
            return Err(IngestError::Sidecar {
                path: path.to_path_buf(),
                line,
                message: "expected two columns".to_string(),
            });
        };
        entries.push((raw.to_string(), surrogate.to_string()));
    }
    Ok(entries)
}

pub fn save_identity_table<'a, I>(path: &Path, entries: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|source| IngestError::FileCreate {
            path: path.to_path_buf(),
            source,
        })?;
    write_all(
        &mut writer,
        path,
        std::iter::once([IDENTITY_HEADER[0].to_string(), IDENTITY_HEADER[1].to_string()])
            .chain(entries.into_iter().map(|(raw, surrogate)| {
                [raw.to_string(), surrogate.to_string()]
            })),
    )
}

/// Load last-used record ids. An absent file is an empty table.
pub fn load_record_id_table(path: &Path) -> Result<Vec<(String, u64)>> {
    if !path.is_file() {
        debug!(path = %path.display(), "no record-id side-table; starting empty");
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|source| IngestError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| IngestError::Record {
            path: path.to_path_buf(),
            source,
        })?;
        let line = index + 1;
        let (Some(table), Some(raw_id)) = (record.get(0), record.get(1)) else {
            return Err(IngestError::Sidecar {
                path: path.to_path_buf(),
                line,
                message: "expected two columns".to_string(),
            });
        };
        let last_used = raw_id.trim().parse::<u64>().map_err(|_| IngestError::Sidecar {
            path: path.to_path_buf(),
            line,
            message: format!("'{raw_id}' is not a record id"),
        })?;
        entries.push((table.to_string(), last_used));
    }
    Ok(entries)
}

pub fn save_record_id_table<'a, I>(path: &Path, entries: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|source| IngestError::FileCreate {
            path: path.to_path_buf(),
            source,
        })?;
    write_all(
        &mut writer,
        path,
        entries
            .into_iter()
            .map(|(table, last_used)| [table.to_string(), last_used.to_string()]),
    )
}

fn write_all<I>(writer: &mut csv::Writer<std::fs::File>, path: &Path, rows: I) -> Result<()>
where
    I: IntoIterator<Item = [String; 2]>,
{
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|source| IngestError::Record {
                path: path.to_path_buf(),
                source,
            })?;
    }
    writer.flush().map_err(|source| IngestError::Record {
        path: path.to_path_buf(),
        source: source.into(),
    })
}
