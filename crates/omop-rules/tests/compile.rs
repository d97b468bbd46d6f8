use std::path::Path;

use omop_model::{PERSON_TABLE, TermMapping};
use omop_rules::{CompileError, compile, parse_document};
use omop_schema::{SchemaConfig, build_schema};

const DDL: &str = r#"
CREATE TABLE person (
    person_id BIGINT NOT NULL,
    gender_concept_id INTEGER NOT NULL,
    ethnicity_concept_id INTEGER NOT NULL,
    year_of_birth INTEGER,
    month_of_birth INTEGER,
    day_of_birth INTEGER,
    birth_datetime TIMESTAMP,
    gender_source_value VARCHAR(50),
    ethnicity_source_value VARCHAR(50)
);

CREATE TABLE measurement (
    measurement_id BIGINT NOT NULL,
    person_id BIGINT NOT NULL,
    measurement_concept_id INTEGER NOT NULL,
    measurement_date DATE,
    measurement_datetime TIMESTAMP,
    value_source_value VARCHAR(50)
);
"#;

const CONFIG: &str = r#"{
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
}"#;

fn schema() -> omop_model::SchemaLookup {
    let config = SchemaConfig::parse(CONFIG).expect("parse config");
    build_schema(DDL, &config, Path::new("cdm.sql")).expect("build schema")
}

const LEGACY_DOC: &str = r#"{
    "metadata": { "dataset": "demo" },
    "cdm": {
        "person": {
            "MALE": {
                "person_id": { "source_table": "demo.csv", "source_field": "id" },
                "birth_datetime": { "source_table": "demo.csv", "source_field": "dob" },
                "gender_concept_id": {
                    "source_table": "demo.csv",
                    "source_field": "sex",
                    "term_mapping": { "M": 8507 }
                },
                "gender_source_value": { "source_table": "demo.csv", "source_field": "sex" }
            },
            "FEMALE": {
                "person_id": { "source_table": "demo.csv", "source_field": "id" },
                "birth_datetime": { "source_table": "demo.csv", "source_field": "dob" },
                "gender_concept_id": {
                    "source_table": "demo.csv",
                    "source_field": "sex",
                    "term_mapping": { "F": 8532 }
                },
                "gender_source_value": { "source_table": "demo.csv", "source_field": "sex" }
            },
            "ETHNICITY": {
                "person_id": { "source_table": "demo.csv", "source_field": "id" },
                "birth_datetime": { "source_table": "demo.csv", "source_field": "dob" },
                "ethnicity_concept_id": {
                    "source_table": "demo.csv",
                    "source_field": "ethnicity",
                    "term_mapping": { "*": 0 }
                },
                "ethnicity_source_value": { "source_table": "demo.csv", "source_field": "ethnicity" }
            }
        }
    }
}"#;

#[test]
fn legacy_person_groups_merge_per_source_field() {
    let document = parse_document(LEGACY_DOC).expect("parse");
    let plan = compile(&document, &schema()).expect("compile");

    let source = plan.source("demo.csv").expect("source plan");
    assert_eq!(source.person_id_field, "id");
    assert_eq!(source.datetime_field, "dob");

    let person = &source.targets[PERSON_TABLE];
    assert_eq!(person.data_columns.len(), 2);

    // MALE and FEMALE labels collapse into one group on the sex column.
    let sex = person
        .data_columns
        .iter()
        .find(|c| c.source_field == "sex")
        .expect("sex column");
    assert_eq!(sex.groups.len(), 1);
    let group = &sex.groups[0];
    let Some(TermMapping::Lookup(lookup)) = &group.term else {
        panic!("expected lookup term");
    };
    assert_eq!(lookup.values["M"]["gender_concept_id"], vec![8507]);
    assert_eq!(lookup.values["F"]["gender_concept_id"], vec![8532]);
    assert_eq!(group.copy_fields, vec!["gender_source_value".to_string()]);

    // The ethnicity wildcard survives on its own column.
    let ethnicity = person
        .data_columns
        .iter()
        .find(|c| c.source_field == "ethnicity")
        .expect("ethnicity column");
    let Some(TermMapping::Lookup(lookup)) = &ethnicity.groups[0].term else {
        panic!("expected lookup term");
    };
    assert!(lookup.values.is_empty());
    assert_eq!(lookup.wildcard.as_ref().expect("wildcard")["ethnicity_concept_id"], vec![0]);
}

#[test]
fn structured_group_compiles_with_bindings() {
    let document = parse_document(
        r#"{
            "metadata": { "dataset": "demo" },
            "cdm": {
                "measurement": {
                    "labs.csv": {
                        "person_id_mapping": { "source_field": "id", "dest_field": "person_id" },
                        "date_mapping": { "source_field": "sample_date", "dest_fields": ["measurement_datetime"] },
                        "concept_mappings": {
                            "result": {
                                "original_value_fields": ["value_source_value"],
                                "positive": { "measurement_concept_id": [123, 124] },
                                "negative": { "measurement_concept_id": 125 }
                            }
                        }
                    }
                }
            }
        }"#,
    )
    .expect("parse");
    let plan = compile(&document, &schema()).expect("compile");

    let source = plan.source("labs.csv").expect("source plan");
    assert_eq!(source.person_id_field, "id");
    assert_eq!(source.datetime_field, "sample_date");

    let measurement = &source.targets["measurement"];
    let identity = measurement.identity.as_ref().expect("identity binding");
    assert_eq!(identity.dest_field, "person_id");
    let date = measurement.date.as_ref().expect("date binding");
    assert_eq!(date.dest_fields, vec!["measurement_datetime".to_string()]);

    let column = &measurement.data_columns[0];
    assert_eq!(column.source_field, "result");
    let Some(TermMapping::Lookup(lookup)) = &column.groups[0].term else {
        panic!("expected lookup term");
    };
    assert_eq!(lookup.values["positive"]["measurement_concept_id"], vec![123, 124]);
    assert_eq!(lookup.values["negative"]["measurement_concept_id"], vec![125]);
}

#[test]
fn unknown_target_table_is_fatal() {
    let document = parse_document(
        r#"{
            "metadata": { "dataset": "demo" },
            "cdm": {
                "visit_occurrence": {
                    "VISIT": {
                        "person_id": { "source_table": "demo.csv", "source_field": "id" }
                    }
                }
            }
        }"#,
    )
    .expect("parse");
    assert!(matches!(
        compile(&document, &schema()),
        Err(CompileError::UnknownTargetTable(table)) if table == "visit_occurrence"
    ));
}

#[test]
fn unknown_target_column_is_fatal() {
    let document = parse_document(
        r#"{
            "metadata": { "dataset": "demo" },
            "cdm": {
                "person": {
                    "MALE": {
                        "sex_concept_id": {
                            "source_table": "demo.csv",
                            "source_field": "sex",
                            "term_mapping": { "M": 8507 }
                        }
                    }
                }
            }
        }"#,
    )
    .expect("parse");
    assert!(matches!(
        compile(&document, &schema()),
        Err(CompileError::UnknownTargetColumn { column, .. }) if column == "sex_concept_id"
    ));
}

#[test]
fn source_without_date_binding_is_skipped_not_fatal() {
    let document = parse_document(
        r#"{
            "metadata": { "dataset": "demo" },
            "cdm": {
                "measurement": {
                    "labs.csv": {
                        "person_id_mapping": { "source_field": "id", "dest_field": "person_id" },
                        "concept_mappings": {
                            "result": { "positive": { "measurement_concept_id": [123] } }
                        }
                    }
                }
            }
        }"#,
    )
    .expect("parse");
    let plan = compile(&document, &schema()).expect("compile succeeds");
    assert!(plan.source("labs.csv").is_none());
    assert_eq!(plan.skipped.len(), 1);
    assert_eq!(plan.skipped[0].source_table, "labs.csv");
}
