//! Matching the plan's source table names to files in the input directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{IngestError, Result};

/// List the delimited files in `dir`, sorted by filename.
pub fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|source| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let delimited = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv")
            });
        if delimited {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Resolve each source table named by the plan to an input file.
///
/// An exact filename match wins; otherwise the file stem is compared
/// against the table name's stem, so rules written against `demo.csv`
/// still find a `demo.tsv` export. Unmatched tables are reported and left
/// out; the run skips them.
pub fn discover_sources<'a, I>(dir: &Path, source_tables: I) -> Result<BTreeMap<String, PathBuf>>
where
    I: IntoIterator<Item = &'a str>,
{
    let files = list_input_files(dir)?;
    let mut matched = BTreeMap::new();
    for table in source_tables {
        match match_table(table, &files) {
            Some(path) => {
                matched.insert(table.to_string(), path);
            }
            None => {
                warn!(source_table = table, input_dir = %dir.display(), "no input file found");
            }
        }
    }
    Ok(matched)
}

fn match_table(table: &str, files: &[PathBuf]) -> Option<PathBuf> {
    if let Some(exact) = files.iter().find(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.eq_ignore_ascii_case(table))
    }) {
        return Some(exact.clone());
    }
    let table_stem = stem(table);
    files
        .iter()
        .find(|path| {
            path.file_stem()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.eq_ignore_ascii_case(table_stem))
        })
        .cloned()
}

/// Table name without a trailing extension, if it carries one.
fn stem(table: &str) -> &str {
    Path::new(table)
        .file_stem()
        .and_then(|name| name.to_str())
        .unwrap_or(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "id\n1\n").unwrap();
    }

    #[test]
    fn lists_only_delimited_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "demo.csv");
        touch(dir.path(), "labs.tsv");
        touch(dir.path(), "notes.txt");

        let files = list_input_files(dir.path()).unwrap();
        let names: Vec<&str> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["demo.csv", "labs.tsv"]);
    }

    #[test]
    fn exact_name_beats_stem_match() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "demo.csv");
        touch(dir.path(), "demo.tsv");

        let matched = discover_sources(dir.path(), ["demo.csv"]).unwrap();
        assert_eq!(
            matched["demo.csv"].file_name().and_then(|n| n.to_str()),
            Some("demo.csv")
        );
    }

    #[test]
    fn stem_match_crosses_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "demo.tsv");

        let matched = discover_sources(dir.path(), ["demo.csv"]).unwrap();
        assert_eq!(
            matched["demo.csv"].file_name().and_then(|n| n.to_str()),
            Some("demo.tsv")
        );
    }

    #[test]
    fn unmatched_tables_are_left_out() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "demo.csv");

        let matched = discover_sources(dir.path(), ["demo.csv", "labs.csv"]).unwrap();
        assert_eq!(matched.len(), 1);
        assert!(!matched.contains_key("labs.csv"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = list_input_files(Path::new("/nonexistent/inputs")).unwrap_err();
        assert!(matches!(err, IngestError::DirectoryNotFound { .. }));
    }
}
