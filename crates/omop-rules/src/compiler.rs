#![deny(unsafe_code)]

//! Compiles a parsed rules document into the per-source-table execution
//! plan. Compilation is eager: every structural problem surfaces here,
//! before any source row is read.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use omop_model::{
    CdmTable, ConceptMap, DataColumn, DateBinding, ExecutionPlan, IdentityBinding, PERSON_TABLE,
    RuleGroup, SchemaLookup, SkippedSource, SourcePlan, TargetPlan, TermMapping, ValueLookup,
};

use crate::document::{
    GroupDocument, LegacyBinding, LegacyTermMapping, RulesDocument, StructuredGroup,
};
use crate::error::CompileError;

/// In-progress rule group for one (target, source field, label).
#[derive(Debug, Default)]
struct GroupAccum {
    values: BTreeMap<String, ConceptMap>,
    wildcard: Option<ConceptMap>,
    constant: Option<ConceptMap>,
    copy_fields: BTreeSet<String>,
}

impl GroupAccum {
    fn add_concepts(&mut self, value: &str, dest_field: &str, ids: Vec<i64>) {
        let branch = if value == "*" {
            self.wildcard.get_or_insert_with(ConceptMap::new)
        } else {
            self.values.entry(value.to_string()).or_default()
        };
        if branch.contains_key(dest_field) {
            warn!(value, dest_field, "duplicate concept binding ignored");
            return;
        }
        branch.insert(dest_field.to_string(), ids);
    }

    fn add_constant(&mut self, dest_field: &str, ids: Vec<i64>) {
        let map = self.constant.get_or_insert_with(ConceptMap::new);
        map.entry(dest_field.to_string()).or_insert(ids);
    }

    fn finish(self, label: &str) -> Option<RuleGroup> {
        let term = if !self.values.is_empty() || self.wildcard.is_some() {
            // A constant alongside a lookup acts as the fallback branch.
            let wildcard = match (self.wildcard, self.constant) {
                (Some(wildcard), _) => Some(wildcard),
                (None, constant) => constant,
            };
            Some(TermMapping::Lookup(ValueLookup {
                values: self.values,
                wildcard,
            }))
        } else {
            self.constant.map(TermMapping::Constant)
        };
        let group = RuleGroup {
            label: label.to_string(),
            term,
            copy_fields: self.copy_fields.into_iter().collect(),
        };
        (!group.is_empty()).then_some(group)
    }
}

/// In-progress plan for one (source table, target table) pair.
#[derive(Debug, Default)]
struct TargetAccum {
    identity: Option<IdentityBinding>,
    date_source: Option<String>,
    date_dests: BTreeSet<String>,
    columns: BTreeMap<String, BTreeMap<String, GroupAccum>>,
}

impl TargetAccum {
    fn set_identity(&mut self, binding: IdentityBinding) {
        match &self.identity {
            None => self.identity = Some(binding),
            Some(existing) if *existing != binding => {
                warn!(
                    kept = existing.source_field,
                    ignored = binding.source_field,
                    "conflicting identity bindings; first one wins"
                );
            }
            Some(_) => {}
        }
    }

    fn add_date(&mut self, source_field: &str, dest_field: &str) {
        match &self.date_source {
            None => self.date_source = Some(source_field.to_string()),
            Some(existing) if existing != source_field => {
                warn!(
                    kept = existing,
                    ignored = source_field,
                    "conflicting date source fields; first one wins"
                );
                return;
            }
            Some(_) => {}
        }
        self.date_dests.insert(dest_field.to_string());
    }

    fn group(&mut self, source_field: &str, label: &str) -> &mut GroupAccum {
        self.columns
            .entry(source_field.to_string())
            .or_default()
            .entry(label.to_string())
            .or_default()
    }
}

/// Compile `document` against `schema` into an execution plan.
///
/// Source tables for which no identity or date binding is discoverable are
/// not an error: they are recorded as skipped and reported by the caller.
pub fn compile(
    document: &RulesDocument,
    schema: &SchemaLookup,
) -> Result<ExecutionPlan, CompileError> {
    let mut accums: BTreeMap<String, BTreeMap<String, TargetAccum>> = BTreeMap::new();

    for (target_name, groups) in &document.targets {
        let table = schema
            .table(target_name)
            .ok_or_else(|| CompileError::UnknownTargetTable(target_name.clone()))?;
        for (key, group) in groups {
            match group {
                GroupDocument::Legacy(bindings) => {
                    compile_legacy_group(&mut accums, table, key, bindings)?;
                }
                GroupDocument::Structured(group) => {
                    compile_structured_group(&mut accums, table, key, group)?;
                }
            }
        }
    }

    let mut plan = ExecutionPlan {
        dataset: document.dataset.clone(),
        ..ExecutionPlan::default()
    };
    for (source_table, targets) in accums {
        match assemble_source_plan(&source_table, targets) {
            Ok(source_plan) => {
                plan.sources.insert(source_table, source_plan);
            }
            Err(reason) => {
                warn!(source_table, reason, "source table cannot be processed");
                plan.skipped.push(SkippedSource {
                    source_table,
                    reason,
                });
            }
        }
    }
    Ok(plan)
}

fn check_column(table: &CdmTable, column: &str) -> Result<(), CompileError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(CompileError::UnknownTargetColumn {
            table: table.name.clone(),
            column: column.to_string(),
        })
    }
}

fn compile_legacy_group(
    accums: &mut BTreeMap<String, BTreeMap<String, TargetAccum>>,
    table: &CdmTable,
    label: &str,
    bindings: &BTreeMap<String, LegacyBinding>,
) -> Result<(), CompileError> {
    // The person target merges every label into one rule group so a source
    // row can never emit more than one person row per data column set.
    let group_label = if table.name == PERSON_TABLE {
        PERSON_TABLE
    } else {
        label
    };
    for (dest_field, binding) in bindings {
        check_column(table, dest_field)?;
        let accum = accums
            .entry(binding.source_table.clone())
            .or_default()
            .entry(table.name.clone())
            .or_default();

        if table.person_id_column.as_deref() == Some(dest_field.as_str()) {
            accum.set_identity(IdentityBinding {
                source_field: binding.source_field.clone(),
                dest_field: dest_field.clone(),
            });
        } else if table.is_date_column(dest_field) {
            accum.add_date(&binding.source_field, dest_field);
        } else if let Some(term) = &binding.term_mapping {
            let group = accum.group(&binding.source_field, group_label);
            match term {
                LegacyTermMapping::Constant(id) => group.add_constant(dest_field, vec![*id]),
                LegacyTermMapping::Lookup(values) => {
                    for (value, ids) in values {
                        group.add_concepts(value, dest_field, ids.to_vec());
                    }
                }
            }
        } else {
            accum
                .group(&binding.source_field, group_label)
                .copy_fields
                .insert(dest_field.clone());
        }
    }
    Ok(())
}

fn compile_structured_group(
    accums: &mut BTreeMap<String, BTreeMap<String, TargetAccum>>,
    table: &CdmTable,
    source_table: &str,
    group: &StructuredGroup,
) -> Result<(), CompileError> {
    let accum = accums
        .entry(source_table.to_string())
        .or_default()
        .entry(table.name.clone())
        .or_default();

    if let Some(mapping) = &group.person_id_mapping {
        check_column(table, &mapping.dest_field)?;
        accum.set_identity(IdentityBinding {
            source_field: mapping.source_field.clone(),
            dest_field: mapping.dest_field.clone(),
        });
    }
    if let Some(mapping) = &group.date_mapping {
        for dest_field in &mapping.dest_fields {
            check_column(table, dest_field)?;
            accum.add_date(&mapping.source_field, dest_field);
        }
    }
    let label = format!("{}/{}", table.name, source_table);
    for (source_field, entry) in &group.concept_mappings {
        let group_accum = accum.group(source_field, &label);
        for dest_field in &entry.original_value_fields {
            check_column(table, dest_field)?;
            group_accum.copy_fields.insert(dest_field.clone());
        }
        for (value, dest_map) in &entry.values {
            for (dest_field, ids) in dest_map {
                check_column(table, dest_field)?;
                group_accum.add_concepts(value, dest_field, ids.to_vec());
            }
        }
    }
    Ok(())
}

fn assemble_source_plan(
    source_table: &str,
    targets: BTreeMap<String, TargetAccum>,
) -> Result<SourcePlan, String> {
    // Identity and date source fields are discovered across every target
    // this source table feeds; the person target takes precedence so its
    // bindings define the table-wide fields.
    let person_id_field = targets
        .get(PERSON_TABLE)
        .and_then(|t| t.identity.as_ref())
        .or_else(|| targets.values().find_map(|t| t.identity.as_ref()))
        .map(|binding| binding.source_field.clone())
        .ok_or_else(|| "no person-id binding found".to_string())?;
    let datetime_field = targets
        .get(PERSON_TABLE)
        .and_then(|t| t.date_source.as_ref())
        .or_else(|| targets.values().find_map(|t| t.date_source.as_ref()))
        .cloned()
        .ok_or_else(|| "no date binding found".to_string())?;

    let mut plan = SourcePlan {
        source_table: source_table.to_string(),
        person_id_field,
        datetime_field,
        targets: BTreeMap::new(),
    };
    for (target_name, accum) in targets {
        let mut data_columns = Vec::new();
        for (source_field, groups) in accum.columns {
            let groups: Vec<RuleGroup> = groups
                .into_iter()
                .filter_map(|(label, group)| group.finish(&label))
                .collect();
            if !groups.is_empty() {
                data_columns.push(DataColumn {
                    source_field,
                    groups,
                });
            }
        }
        if data_columns.is_empty() {
            continue;
        }
        let date = accum.date_source.map(|source_field| DateBinding {
            source_field,
            dest_fields: accum.date_dests.iter().cloned().collect(),
        });
        plan.targets.insert(
            target_name.clone(),
            TargetPlan {
                target_table: target_name,
                identity: accum.identity,
                date,
                data_columns,
            },
        );
    }
    Ok(plan)
}
