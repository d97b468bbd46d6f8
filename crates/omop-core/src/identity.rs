//! The person-identity registry: a persistent bijection between raw source
//! identifiers and surrogate identifiers.

use tracing::debug;

use std::collections::BTreeMap;

use crate::datetime::parse_source_date;

/// Outcome of attempting to register a person-source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonRegistration {
    /// Registered (or already present); carries the surrogate id.
    Registered(String),
    /// Blank identifier or invalid birth date; the row is not a person.
    Rejected,
}

/// In-memory registry, loaded from the persisted side-table at run start
/// and rewritten in full at run end. Surrogates are either sequential
/// integers or pass-through copies of the raw id, fixed per dataset.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    entries: BTreeMap<String, String>,
    next_id: u64,
    passthrough: bool,
}

impl IdentityRegistry {
    pub fn new(passthrough: bool) -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
            passthrough,
        }
    }

    /// Seed from previously persisted pairs. The integer counter resumes
    /// from the highest numeric surrogate seen, so new registrations never
    /// collide with earlier runs.
    pub fn from_entries<I>(pairs: I, passthrough: bool) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut registry = Self::new(passthrough);
        for (raw, surrogate) in pairs {
            if let Ok(numeric) = surrogate.parse::<u64>() {
                registry.next_id = registry.next_id.max(numeric + 1);
            }
            registry.entries.insert(raw, surrogate);
        }
        registry
    }

    /// Register a person-source row. Blank ids and birth dates matching no
    /// known format are rejected; re-registering a known id returns the
    /// existing surrogate.
    pub fn register(&mut self, raw_id: &str, birth_date: &str) -> PersonRegistration {
        if raw_id.trim().is_empty() || parse_source_date(birth_date).is_none() {
            return PersonRegistration::Rejected;
        }
        if let Some(existing) = self.entries.get(raw_id) {
            return PersonRegistration::Registered(existing.clone());
        }
        let surrogate = if self.passthrough {
            raw_id.to_string()
        } else {
            let id = self.next_id.to_string();
            self.next_id += 1;
            id
        };
        debug!(surrogate, "registered person");
        self.entries.insert(raw_id.to_string(), surrogate.clone());
        PersonRegistration::Registered(surrogate)
    }

    /// Surrogate for a raw id, when registered.
    pub fn resolve(&self, raw_id: &str) -> Option<&str> {
        self.entries.get(raw_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All pairs, for persisting the side-table at run end.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(raw, surrogate)| (raw.as_str(), surrogate.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_surrogates_start_at_one() {
        let mut registry = IdentityRegistry::new(false);
        assert_eq!(
            registry.register("7", "2001-01-01"),
            PersonRegistration::Registered("1".to_string())
        );
        assert_eq!(
            registry.register("9", "2002-02-02"),
            PersonRegistration::Registered("2".to_string())
        );
    }

    #[test]
    fn reregistration_is_stable() {
        let mut registry = IdentityRegistry::new(false);
        let first = registry.register("7", "2001-01-01");
        let second = registry.register("7", "2001-01-01");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn seeded_registry_never_collides() {
        let pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "5".to_string()),
        ];
        let mut registry = IdentityRegistry::from_entries(pairs, false);
        assert_eq!(registry.resolve("b"), Some("5"));
        assert_eq!(
            registry.register("c", "2001-01-01"),
            PersonRegistration::Registered("6".to_string())
        );
    }

    #[test]
    fn passthrough_keeps_raw_ids() {
        let mut registry = IdentityRegistry::new(true);
        assert_eq!(
            registry.register("ABC-1", "2001-01-01"),
            PersonRegistration::Registered("ABC-1".to_string())
        );
    }

    #[test]
    fn blank_id_and_bad_birth_date_are_rejected() {
        let mut registry = IdentityRegistry::new(false);
        assert_eq!(registry.register("  ", "2001-01-01"), PersonRegistration::Rejected);
        assert_eq!(registry.register("7", "01.01.2001"), PersonRegistration::Rejected);
        assert!(registry.is_empty());
    }
}
