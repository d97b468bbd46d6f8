//! Term mappings: how a source value selects concept ids for target fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Destination assignments for one resolved value branch: target field name
/// to the concept ids it receives.
pub type ConceptMap = BTreeMap<String, Vec<i64>>;

/// A rule's value-to-concept lookup.
///
/// `Constant` assigns the same concepts regardless of the source value.
/// `Lookup` selects a branch by exact value, falling back to the wildcard
/// entry when present. An explicit key always wins over the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermMapping {
    Constant(ConceptMap),
    Lookup(ValueLookup),
}

/// Value-keyed concept lookup with an optional `"*"` fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueLookup {
    pub values: BTreeMap<String, ConceptMap>,
    pub wildcard: Option<ConceptMap>,
}

impl TermMapping {
    /// Resolve the branch applicable to `value`, if any.
    pub fn resolve(&self, value: &str) -> Option<&ConceptMap> {
        match self {
            Self::Constant(map) => Some(map),
            Self::Lookup(lookup) => lookup.values.get(value).or(lookup.wildcard.as_ref()),
        }
    }

    /// All destination fields this mapping can write to.
    pub fn dest_fields(&self) -> impl Iterator<Item = &str> {
        let maps: Vec<&ConceptMap> = match self {
            Self::Constant(map) => vec![map],
            Self::Lookup(lookup) => lookup
                .values
                .values()
                .chain(lookup.wildcard.as_ref())
                .collect(),
        };
        maps.into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept_map(field: &str, ids: &[i64]) -> ConceptMap {
        let mut map = ConceptMap::new();
        map.insert(field.to_string(), ids.to_vec());
        map
    }

    #[test]
    fn exact_key_wins_over_wildcard() {
        let mut values = BTreeMap::new();
        values.insert("M".to_string(), concept_map("gender_concept_id", &[8507]));
        let mapping = TermMapping::Lookup(ValueLookup {
            values,
            wildcard: Some(concept_map("gender_concept_id", &[0])),
        });

        let hit = mapping.resolve("M").expect("exact branch");
        assert_eq!(hit["gender_concept_id"], vec![8507]);
        let fallback = mapping.resolve("F").expect("wildcard branch");
        assert_eq!(fallback["gender_concept_id"], vec![0]);
    }

    #[test]
    fn lookup_without_wildcard_misses() {
        let mut values = BTreeMap::new();
        values.insert("M".to_string(), concept_map("gender_concept_id", &[8507]));
        let mapping = TermMapping::Lookup(ValueLookup {
            values,
            wildcard: None,
        });
        assert!(mapping.resolve("F").is_none());
    }

    #[test]
    fn constant_ignores_value() {
        let mapping = TermMapping::Constant(concept_map("ethnicity_concept_id", &[38003564]));
        assert!(mapping.resolve("anything").is_some());
    }
}
