//! Delimited-file backends for the row-source and row-sink contracts.
//!
//! Input delimiter follows the file extension (`.tsv` is tab-separated,
//! anything else comma-separated); output tables are always written as TSV.

use std::fs::File;
use std::path::{Path, PathBuf};

use omop_model::{ModelError, Result as ModelResult, RowSink, RowSource, SourceRow};

use crate::error::{IngestError, Result};

/// Delimiter implied by a source file's extension.
pub fn delimiter_for(path: &Path) -> u8 {
    let is_tsv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"));
    if is_tsv { b'\t' } else { b',' }
}

/// Streaming reader over one delimited source file.
pub struct FileRowSource {
    table: String,
    path: PathBuf,
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<File>,
}

impl FileRowSource {
    pub fn open(table: impl Into<String>, path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter_for(path))
            .flexible(true)
            .from_path(path)
            .map_err(|source| IngestError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let headers = reader
            .headers()
            .map_err(|source| IngestError::Record {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect();
        Ok(Self {
            table: table.into(),
            path: path.to_path_buf(),
            headers,
            records: reader.into_records(),
        })
    }
}

impl RowSource for FileRowSource {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn next_row(&mut self) -> ModelResult<Option<SourceRow>> {
        let Some(record) = self.records.next() else {
            return Ok(None);
        };
        let record = record.map_err(|e| {
            ModelError::Message(format!("malformed record in {}: {e}", self.path.display()))
        })?;
        let mut row = SourceRow::new();
        // flexible(true) tolerates ragged rows; missing trailing cells
        // read back as absent fields.
        for (header, value) in self.headers.iter().zip(record.iter()) {
            row.insert(header.clone(), value);
        }
        Ok(Some(row))
    }
}

/// Tab-separated writer for one target table.
pub struct TsvRowSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl TsvRowSink {
    pub fn create(path: &Path) -> Result<Self> {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .map_err(|source| IngestError::FileCreate {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }
}

impl RowSink for TsvRowSink {
    fn write_header(&mut self, columns: &[String]) -> ModelResult<()> {
        self.writer.write_record(columns).map_err(|e| {
            ModelError::Message(format!("failed to write {}: {e}", self.path.display()))
        })
    }

    fn write_row(&mut self, values: &[String]) -> ModelResult<()> {
        self.writer.write_record(values).map_err(|e| {
            ModelError::Message(format!("failed to write {}: {e}", self.path.display()))
        })
    }

    fn finish(&mut self) -> ModelResult<()> {
        self.writer.flush().map_err(|e| {
            ModelError::Message(format!("failed to flush {}: {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_selects_the_delimiter() {
        assert_eq!(delimiter_for(Path::new("demo.tsv")), b'\t');
        assert_eq!(delimiter_for(Path::new("demo.TSV")), b'\t');
        assert_eq!(delimiter_for(Path::new("demo.csv")), b',');
        assert_eq!(delimiter_for(Path::new("demo")), b',');
    }

    #[test]
    fn reads_csv_rows_by_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.csv");
        std::fs::write(&path, "id,sex\n7,M\n8,F\n").unwrap();

        let mut source = FileRowSource::open("demo.csv", &path).unwrap();
        assert_eq!(source.table_name(), "demo.csv");
        let row = source.next_row().unwrap().unwrap();
        assert_eq!(row.get("id"), "7");
        assert_eq!(row.get("sex"), "M");
        let row = source.next_row().unwrap().unwrap();
        assert_eq!(row.get("id"), "8");
        assert!(source.next_row().unwrap().is_none());
    }

    #[test]
    fn ragged_rows_read_missing_cells_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.tsv");
        std::fs::write(&path, "id\tsex\tdob\n7\tM\n").unwrap();

        let mut source = FileRowSource::open("demo.tsv", &path).unwrap();
        let row = source.next_row().unwrap().unwrap();
        assert_eq!(row.get("sex"), "M");
        assert_eq!(row.get("dob"), "");
    }

    #[test]
    fn sink_writes_tab_separated_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.tsv");

        let mut sink = TsvRowSink::create(&path).unwrap();
        sink.write_header(&["person_id".to_string(), "gender_concept_id".to_string()])
            .unwrap();
        sink.write_row(&["1".to_string(), "8507".to_string()]).unwrap();
        sink.finish().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "person_id\tgender_concept_id\n1\t8507\n");
    }
}
