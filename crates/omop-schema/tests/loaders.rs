use std::path::Path;

use omop_schema::{SchemaConfig, SchemaError, build_schema};

const DDL: &str = r#"
CREATE TABLE person (
    person_id BIGINT NOT NULL,
    gender_concept_id INTEGER NOT NULL,
    year_of_birth INTEGER,
    month_of_birth INTEGER,
    day_of_birth INTEGER,
    birth_datetime TIMESTAMP,
    gender_source_value VARCHAR(50),
    person_source_value VARCHAR(50)
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

#[test]
fn schema_combines_ddl_and_config() {
    let lookup = schema();
    let person = lookup.table("person").expect("person table");
    assert_eq!(person.columns().len(), 8);
    assert_eq!(person.person_id_column.as_deref(), Some("person_id"));
    assert!(person.notnull_numeric.contains("gender_concept_id"));
    assert!(person.datetime_columns.contains("birth_datetime"));
    let components = &person.date_components["birth_datetime"];
    assert_eq!(components.year, "year_of_birth");

    let measurement = lookup.table("measurement").expect("measurement table");
    assert_eq!(
        measurement.autonumber_column.as_deref(),
        Some("measurement_id")
    );
    assert_eq!(
        measurement.linked_dates.get("measurement_datetime").map(String::as_str),
        Some("measurement_date")
    );
}

#[test]
fn every_override_kind_applies_to_one_table() {
    let config = SchemaConfig::parse(
        r#"{
            "measurement": {
                "person_id": "person_id",
                "autonumber": "measurement_id",
                "notnull_numeric": ["value_source_value"],
                "date_components": {
                    "measurement_datetime": {
                        "year": "measurement_id",
                        "month": "person_id",
                        "day": "measurement_concept_id"
                    }
                },
                "linked_dates": { "measurement_datetime": "measurement_date" }
            }
        }"#,
    )
    .expect("parse config");
    let lookup = build_schema(DDL, &config, Path::new("cdm.sql")).expect("build schema");
    let measurement = lookup.table("measurement").expect("measurement table");
    assert_eq!(measurement.person_id_column.as_deref(), Some("person_id"));
    assert_eq!(
        measurement.autonumber_column.as_deref(),
        Some("measurement_id")
    );
    assert!(measurement.notnull_numeric.contains("value_source_value"));
    assert_eq!(
        measurement.date_components["measurement_datetime"].day,
        "measurement_concept_id"
    );
    assert_eq!(
        measurement.linked_dates["measurement_datetime"],
        "measurement_date"
    );
}

#[test]
fn unknown_config_table_is_fatal() {
    let config = SchemaConfig::parse(r#"{ "visit": { "person_id": "person_id" } }"#)
        .expect("parse config");
    let err = build_schema(DDL, &config, Path::new("cdm.sql")).expect_err("unknown table");
    assert!(matches!(err, SchemaError::UnknownTable { table } if table == "visit"));
}

#[test]
fn unknown_config_column_is_fatal() {
    let config = SchemaConfig::parse(r#"{ "person": { "person_id": "subject_id" } }"#)
        .expect("parse config");
    let err = build_schema(DDL, &config, Path::new("cdm.sql")).expect_err("unknown column");
    assert!(
        matches!(err, SchemaError::UnknownColumn { table, column } if table == "person" && column == "subject_id")
    );
}
