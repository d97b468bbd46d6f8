//! Read-only description of the CDM target schema and the draft rows
//! shaped by it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Year/month/day sub-columns a date column decomposes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateComponents {
    pub year: String,
    pub month: String,
    pub day: String,
}

/// Column metadata for one CDM target table.
#[derive(Debug, Clone)]
pub struct CdmTable {
    pub name: String,
    columns: Vec<String>,
    index: HashMap<String, usize>,
    /// Column holding the (surrogate) person identifier.
    pub person_id_column: Option<String>,
    /// Column receiving per-table monotonic record ids.
    pub autonumber_column: Option<String>,
    /// NOT NULL numeric columns, pre-seeded to `"0"` in drafts.
    pub notnull_numeric: BTreeSet<String>,
    /// Datetime-typed columns, used to discover date bindings.
    pub datetime_columns: BTreeSet<String>,
    /// Datetime columns that decompose into year/month/day sub-columns.
    pub date_components: BTreeMap<String, DateComponents>,
    /// Datetime columns with a date-only sibling receiving the first ten
    /// characters of the value.
    pub linked_dates: BTreeMap<String, String>,
}

impl CdmTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, col)| (col.clone(), i))
            .collect();
        Self {
            name: name.into(),
            columns,
            index,
            person_id_column: None,
            autonumber_column: None,
            notnull_numeric: BTreeSet::new(),
            datetime_columns: BTreeSet::new(),
            date_components: BTreeMap::new(),
            linked_dates: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// True when `column` is a date destination of any flavour.
    pub fn is_date_column(&self, column: &str) -> bool {
        self.datetime_columns.contains(column)
            || self.date_components.contains_key(column)
            || self.linked_dates.contains_key(column)
    }
}

/// Lookup over every target table the run may write to.
#[derive(Debug, Clone, Default)]
pub struct SchemaLookup {
    tables: BTreeMap<String, CdmTable>,
}

impl SchemaLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: CdmTable) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&CdmTable> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

/// A mutable output row sized to a target table's column count.
///
/// NOT NULL numeric columns start as `"0"`, everything else empty; bindings
/// mutate cells in place and the finished row is frozen into its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDraft {
    values: Vec<String>,
}

impl RowDraft {
    pub fn seeded(table: &CdmTable) -> Self {
        let values = table
            .columns
            .iter()
            .map(|col| {
                if table.notnull_numeric.contains(col) {
                    "0".to_string()
                } else {
                    String::new()
                }
            })
            .collect();
        Self { values }
    }

    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        self.values[index] = value.into();
    }

    pub fn get(&self, index: usize) -> &str {
        &self.values[index]
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}
