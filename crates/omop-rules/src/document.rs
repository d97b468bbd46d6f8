#![deny(unsafe_code)]

//! The raw mapping-rules document in both supported dialects.
//!
//! The legacy dialect keys rule groups by label and binds one target field
//! per entry; the structured successor keys groups by source file and
//! carries per-field value maps. Dialect is detected structurally per
//! group, so mixed documents parse too.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::CompileError;

/// Concept id list that may be written as a bare integer in JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConceptIds {
    One(i64),
    Many(Vec<i64>),
}

impl ConceptIds {
    pub fn to_vec(&self) -> Vec<i64> {
        match self {
            Self::One(id) => vec![*id],
            Self::Many(ids) => ids.clone(),
        }
    }
}

/// Legacy leaf: one target field bound to a source field, optionally with
/// a term mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyBinding {
    pub source_table: String,
    pub source_field: String,
    #[serde(default)]
    pub term_mapping: Option<LegacyTermMapping>,
}

/// Legacy term mapping: a bare concept id (constant) or a value lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LegacyTermMapping {
    Constant(i64),
    Lookup(BTreeMap<String, ConceptIds>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonIdMapping {
    pub source_field: String,
    pub dest_field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateMapping {
    pub source_field: String,
    pub dest_fields: Vec<String>,
}

/// Structured per-field entry: source values to destination concept lists,
/// plus the destination fields that receive the raw value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptMappingEntry {
    #[serde(default)]
    pub original_value_fields: Vec<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, BTreeMap<String, ConceptIds>>,
}

/// Structured group: everything one source file contributes to one target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructuredGroup {
    #[serde(default)]
    pub person_id_mapping: Option<PersonIdMapping>,
    #[serde(default)]
    pub date_mapping: Option<DateMapping>,
    #[serde(default)]
    pub concept_mappings: BTreeMap<String, ConceptMappingEntry>,
}

/// One parsed rule group in either dialect.
#[derive(Debug, Clone)]
pub enum GroupDocument {
    /// Keyed by label; target field to binding.
    Legacy(BTreeMap<String, LegacyBinding>),
    /// Keyed by source file.
    Structured(StructuredGroup),
}

/// Parsed rules document: dataset name plus, per target table, the rule
/// groups keyed by label (legacy) or source file (structured).
#[derive(Debug, Clone)]
pub struct RulesDocument {
    pub dataset: String,
    pub targets: BTreeMap<String, BTreeMap<String, GroupDocument>>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    metadata: Metadata,
    cdm: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    dataset: String,
}

const STRUCTURED_KEYS: [&str; 3] = ["concept_mappings", "person_id_mapping", "date_mapping"];

fn is_structured(value: &serde_json::Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| STRUCTURED_KEYS.iter().any(|key| obj.contains_key(*key)))
}

/// Parse a rules document, detecting the dialect of each group.
pub fn parse_document(text: &str) -> Result<RulesDocument, CompileError> {
    let raw: RawDocument = serde_json::from_str(text)?;
    let mut targets = BTreeMap::new();
    for (target, groups) in raw.cdm {
        let mut parsed = BTreeMap::new();
        for (key, value) in groups {
            let group = if is_structured(&value) {
                GroupDocument::Structured(serde_json::from_value(value).map_err(|source| {
                    CompileError::Group {
                        target: target.clone(),
                        key: key.clone(),
                        source,
                    }
                })?)
            } else {
                GroupDocument::Legacy(serde_json::from_value(value).map_err(|source| {
                    CompileError::Group {
                        target: target.clone(),
                        key: key.clone(),
                        source,
                    }
                })?)
            };
            parsed.insert(key, group);
        }
        targets.insert(target, parsed);
    }
    Ok(RulesDocument {
        dataset: raw.metadata.dataset,
        targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_legacy_groups() {
        let document = parse_document(
            r#"{
                "metadata": { "dataset": "demo" },
                "cdm": {
                    "person": {
                        "MALE": {
                            "gender_concept_id": {
                                "source_table": "demo.csv",
                                "source_field": "sex",
                                "term_mapping": { "M": 8507 }
                            }
                        }
                    }
                }
            }"#,
        )
        .expect("parse document");
        assert_eq!(document.dataset, "demo");
        let group = &document.targets["person"]["MALE"];
        let GroupDocument::Legacy(bindings) = group else {
            panic!("expected legacy group");
        };
        let binding = &bindings["gender_concept_id"];
        assert_eq!(binding.source_field, "sex");
        assert!(matches!(
            binding.term_mapping,
            Some(LegacyTermMapping::Lookup(_))
        ));
    }

    #[test]
    fn detects_structured_groups() {
        let document = parse_document(
            r#"{
                "metadata": { "dataset": "demo" },
                "cdm": {
                    "measurement": {
                        "labs.csv": {
                            "person_id_mapping": { "source_field": "id", "dest_field": "person_id" },
                            "date_mapping": { "source_field": "date", "dest_fields": ["measurement_datetime"] },
                            "concept_mappings": {
                                "result": {
                                    "original_value_fields": ["value_source_value"],
                                    "positive": { "measurement_concept_id": [123, 124] }
                                }
                            }
                        }
                    }
                }
            }"#,
        )
        .expect("parse document");
        let GroupDocument::Structured(group) = &document.targets["measurement"]["labs.csv"] else {
            panic!("expected structured group");
        };
        assert_eq!(
            group.person_id_mapping.as_ref().map(|m| m.dest_field.as_str()),
            Some("person_id")
        );
        let entry = &group.concept_mappings["result"];
        assert_eq!(entry.original_value_fields, vec!["value_source_value"]);
        assert_eq!(
            entry.values["positive"]["measurement_concept_id"].to_vec(),
            vec![123, 124]
        );
    }

    #[test]
    fn malformed_document_is_fatal() {
        assert!(matches!(
            parse_document(r#"{ "cdm": {} }"#),
            Err(CompileError::Document(_))
        ));
    }
}
