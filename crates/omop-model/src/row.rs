//! Source rows and the row-source / row-sink contracts the core processes
//! through. Concrete backends (files, databases, object stores) live
//! outside the core and only need to satisfy these traits.

use std::collections::BTreeMap;

use crate::error::Result;

/// One row of a source table, keyed by source field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRow {
    cells: BTreeMap<String, String>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(field.into(), value.into());
    }

    /// Field value, or the empty string when the field is absent.
    pub fn get(&self, field: &str) -> &str {
        self.cells.get(field).map_or("", String::as_str)
    }

    pub fn is_blank(&self, field: &str) -> bool {
        self.get(field).trim().is_empty()
    }
}

/// Sequential reader over one source table. Reads are blocking from the
/// core's point of view; backends may buffer however they like.
pub trait RowSource {
    fn table_name(&self) -> &str;

    /// Next row, or `None` when the table is drained.
    fn next_row(&mut self) -> Result<Option<SourceRow>>;
}

/// Sequential writer for one target table.
pub trait RowSink {
    fn write_header(&mut self, columns: &[String]) -> Result<()>;

    fn write_row(&mut self, values: &[String]) -> Result<()>;

    /// Flush any buffered state. Called once after the last row.
    fn finish(&mut self) -> Result<()>;
}
