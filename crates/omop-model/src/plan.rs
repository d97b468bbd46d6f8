//! The compiled execution plan: everything row processing needs, resolved
//! once per run from the rules document and the target schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rule::{DateBinding, FieldRef, IdentityBinding, RuleGroup};

/// Name of the once-per-subject CDM target table.
pub const PERSON_TABLE: &str = "person";

/// One source field with its resolved rule groups for a target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataColumn {
    pub source_field: String,
    pub groups: Vec<RuleGroup>,
}

/// All rules feeding one target table from one source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPlan {
    pub target_table: String,
    pub identity: Option<IdentityBinding>,
    pub date: Option<DateBinding>,
    pub data_columns: Vec<DataColumn>,
}

/// Everything known about one source table after compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePlan {
    pub source_table: String,
    /// Source field carrying the raw person identifier.
    pub person_id_field: String,
    /// Source field carrying the event (or birth) date.
    pub datetime_field: String,
    pub targets: BTreeMap<String, TargetPlan>,
}

impl SourcePlan {
    pub fn feeds_person(&self) -> bool {
        self.targets.contains_key(PERSON_TABLE)
    }

    /// Qualified reference to the field carrying the raw person id.
    pub fn person_id_ref(&self) -> FieldRef {
        FieldRef::new(&self.source_table, &self.person_id_field)
    }
}

/// A mapped source table the compiler could not make processable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSource {
    pub source_table: String,
    pub reason: String,
}

/// Per-run compilation result. Immutable after compile; row processing
/// consults this map only and never re-walks the rules document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub dataset: String,
    pub sources: BTreeMap<String, SourcePlan>,
    pub skipped: Vec<SkippedSource>,
}

impl ExecutionPlan {
    pub fn source(&self, source_table: &str) -> Option<&SourcePlan> {
        self.sources.get(source_table)
    }

    /// Source plans ordered for processing: tables feeding `person` first,
    /// so the identity registry is populated before any other target needs
    /// to resolve a person id. Lexicographic within each half.
    pub fn sources_person_first(&self) -> Vec<&SourcePlan> {
        let mut ordered: Vec<&SourcePlan> = self.sources.values().collect();
        ordered.sort_by_key(|plan| (!plan.feeds_person(), plan.source_table.clone()));
        ordered
    }

    /// Every target table reachable from any source.
    pub fn target_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self
            .sources
            .values()
            .flat_map(|plan| plan.targets.keys().map(String::as_str))
            .collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_plan(name: &str, targets: &[&str]) -> SourcePlan {
        SourcePlan {
            source_table: name.to_string(),
            person_id_field: "id".to_string(),
            datetime_field: "date".to_string(),
            targets: targets
                .iter()
                .map(|t| {
                    (
                        t.to_string(),
                        TargetPlan {
                            target_table: t.to_string(),
                            identity: None,
                            date: None,
                            data_columns: Vec::new(),
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn person_sources_are_ordered_first() {
        let mut plan = ExecutionPlan::default();
        plan.sources
            .insert("a.csv".to_string(), source_plan("a.csv", &["measurement"]));
        plan.sources
            .insert("z.csv".to_string(), source_plan("z.csv", &["person"]));
        let ordered: Vec<&str> = plan
            .sources_person_first()
            .iter()
            .map(|p| p.source_table.as_str())
            .collect();
        assert_eq!(ordered, vec!["z.csv", "a.csv"]);
    }

    #[test]
    fn target_tables_are_deduplicated() {
        let mut plan = ExecutionPlan::default();
        plan.sources
            .insert("a.csv".to_string(), source_plan("a.csv", &["measurement"]));
        plan.sources.insert(
            "b.csv".to_string(),
            source_plan("b.csv", &["measurement", "person"]),
        );
        assert_eq!(plan.target_tables(), vec!["measurement", "person"]);
    }
}
