pub mod error;
pub mod plan;
pub mod row;
pub mod rule;
pub mod schema;
pub mod term;

pub use error::{ModelError, Result};
pub use plan::{DataColumn, ExecutionPlan, PERSON_TABLE, SkippedSource, SourcePlan, TargetPlan};
pub use row::{RowSink, RowSource, SourceRow};
pub use rule::{DateBinding, FieldRef, IdentityBinding, RuleGroup};
pub use schema::{CdmTable, DateComponents, RowDraft, SchemaLookup};
pub use term::{ConceptMap, TermMapping, ValueLookup};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_group_serializes() {
        let group = RuleGroup {
            label: "MALE".to_string(),
            term: None,
            copy_fields: vec!["gender_source_value".to_string()],
        };
        let json = serde_json::to_string(&group).expect("serialize group");
        let round: RuleGroup = serde_json::from_str(&json).expect("deserialize group");
        assert_eq!(round, group);
    }
}
