#![deny(unsafe_code)]

//! Loads the CDM schema description: a DDL file giving table and column
//! order plus a JSON config layering on the relationships the core needs
//! (person-id column, auto-increment column, date decompositions).

pub mod config;
pub mod ddl;
pub mod error;

use std::path::Path;

use omop_model::{CdmTable, DateComponents, SchemaLookup};

pub use config::{DateComponentsConfig, SchemaConfig, TableConfig};
pub use ddl::{DdlColumn, DdlTable, parse_ddl};
pub use error::SchemaError;

/// Load the schema lookup from a DDL file and an optional JSON config.
pub fn load_schema(ddl_path: &Path, config_path: Option<&Path>) -> Result<SchemaLookup, SchemaError> {
    let ddl_text = std::fs::read_to_string(ddl_path).map_err(|e| SchemaError::io(ddl_path, e))?;
    let config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
            SchemaConfig::parse(&text).map_err(|source| SchemaError::Config {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => SchemaConfig::default(),
    };
    build_schema(&ddl_text, &config, ddl_path)
}

/// Build the schema lookup from in-memory inputs. Config entries naming
/// tables or columns absent from the DDL are fatal.
pub fn build_schema(
    ddl_text: &str,
    config: &SchemaConfig,
    ddl_path: &Path,
) -> Result<SchemaLookup, SchemaError> {
    let ddl_tables = parse_ddl(ddl_text).map_err(|message| SchemaError::Ddl {
        path: ddl_path.to_path_buf(),
        message,
    })?;

    let mut lookup = SchemaLookup::new();
    for ddl_table in &ddl_tables {
        let columns = ddl_table.columns.iter().map(|c| c.name.clone()).collect();
        let mut table = CdmTable::new(ddl_table.name.clone(), columns);
        for column in &ddl_table.columns {
            if column.not_null && column.is_numeric() {
                table.notnull_numeric.insert(column.name.clone());
            }
            if column.is_datetime() {
                table.datetime_columns.insert(column.name.clone());
            }
        }
        apply_table_config(&mut table, config)?;
        lookup.insert(table);
    }

    for name in config.tables.keys() {
        if lookup.table(name).is_none() {
            return Err(SchemaError::UnknownTable {
                table: name.clone(),
            });
        }
    }
    Ok(lookup)
}

fn apply_table_config(table: &mut CdmTable, config: &SchemaConfig) -> Result<(), SchemaError> {
    let Some(overrides) = config.tables.get(&table.name) else {
        return Ok(());
    };
    if let Some(person_id) = &overrides.person_id {
        check_column(table, person_id)?;
        table.person_id_column = Some(person_id.clone());
    }
    if let Some(autonumber) = &overrides.autonumber {
        check_column(table, autonumber)?;
        table.autonumber_column = Some(autonumber.clone());
    }
    for column in &overrides.notnull_numeric {
        check_column(table, column)?;
        table.notnull_numeric.insert(column.clone());
    }
    for (column, components) in &overrides.date_components {
        check_column(table, column)?;
        check_column(table, &components.year)?;
        check_column(table, &components.month)?;
        check_column(table, &components.day)?;
        table.date_components.insert(
            column.clone(),
            DateComponents {
                year: components.year.clone(),
                month: components.month.clone(),
                day: components.day.clone(),
            },
        );
    }
    for (column, sibling) in &overrides.linked_dates {
        check_column(table, column)?;
        check_column(table, sibling)?;
        table.linked_dates.insert(column.clone(), sibling.clone());
    }
    Ok(())
}

fn check_column(table: &CdmTable, column: &str) -> Result<(), SchemaError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(SchemaError::UnknownColumn {
            table: table.name.clone(),
            column: column.to_string(),
        })
    }
}
