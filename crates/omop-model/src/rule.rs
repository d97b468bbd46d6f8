//! Rule bindings produced by the compiler from either rules dialect.

use serde::{Deserialize, Serialize};

use crate::term::TermMapping;

/// A (table, field) pair identifying a column in a source or target table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub table: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
        }
    }
}

/// Binding of the source person-identifier field to the target person-id
/// column. The raw identifier is copied verbatim at build time; surrogate
/// substitution happens in the allocator stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityBinding {
    pub source_field: String,
    pub dest_field: String,
}

/// Binding of a source date field to one or more target date columns.
///
/// Whether a destination decomposes into year/month/day sub-columns or has
/// a linked date-only sibling is declared by the target schema, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBinding {
    pub source_field: String,
    pub dest_fields: Vec<String>,
}

/// One bundle of concept and copy-through bindings activated by a single
/// source field's value. Both rules dialects compile down to this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    /// Originating label (legacy dialect) or `target/source` key (structured).
    pub label: String,
    /// Concept lookup applied to the activating value, if any.
    pub term: Option<TermMapping>,
    /// Destination fields receiving the unmodified source value.
    pub copy_fields: Vec<String>,
}

impl RuleGroup {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            term: None,
            copy_fields: Vec::new(),
        }
    }

    /// True when the group can never contribute anything to an output row.
    pub fn is_empty(&self) -> bool {
        self.term.is_none() && self.copy_fields.is_empty()
    }
}
