#![deny(unsafe_code)]

//! JSON override config layered on top of the DDL: per-table person-id and
//! auto-increment columns, extra NOT NULL numeric columns, and the
//! date-component / linked-date relationships the DDL cannot express.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DateComponentsConfig {
    pub year: String,
    pub month: String,
    pub day: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Column holding the person identifier.
    #[serde(default)]
    pub person_id: Option<String>,
    /// Column receiving allocator-assigned record ids.
    #[serde(default)]
    pub autonumber: Option<String>,
    /// Columns seeded `"0"` in drafts in addition to those derived from
    /// the DDL's NOT NULL numeric columns.
    #[serde(default)]
    pub notnull_numeric: Vec<String>,
    /// Datetime column to its year/month/day sub-columns.
    #[serde(default)]
    pub date_components: BTreeMap<String, DateComponentsConfig>,
    /// Datetime column to its date-only sibling column.
    #[serde(default)]
    pub linked_dates: BTreeMap<String, String>,
}

/// Whole config document: table name to overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    #[serde(flatten)]
    pub tables: BTreeMap<String, TableConfig>,
}

impl SchemaConfig {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_overrides() {
        let config = SchemaConfig::parse(
            r#"{
                "person": {
                    "person_id": "person_id",
                    "date_components": {
                        "birth_datetime": {
                            "year": "year_of_birth",
                            "month": "month_of_birth",
                            "day": "day_of_birth"
                        }
                    }
                },
                "measurement": {
                    "person_id": "person_id",
                    "autonumber": "measurement_id",
                    "linked_dates": { "measurement_datetime": "measurement_date" }
                }
            }"#,
        )
        .expect("parse config");
        assert_eq!(config.tables.len(), 2);
        let person = &config.tables["person"];
        assert_eq!(person.person_id.as_deref(), Some("person_id"));
        assert_eq!(
            person.date_components["birth_datetime"].year,
            "year_of_birth"
        );
        let measurement = &config.tables["measurement"];
        assert_eq!(measurement.autonumber.as_deref(), Some("measurement_id"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(SchemaConfig::parse(r#"{ "person": { "autoincrement": "x" } }"#).is_err());
    }
}
