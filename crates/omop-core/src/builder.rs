//! The record builder: applies one source row to one target plan and
//! produces zero or more draft rows.
//!
//! Ordinary data-quality failures (blank values, unmapped values, bad
//! dates) never raise errors; each one lands in exactly one metrics
//! counter and the affected draft is simply not produced.

use std::collections::HashSet;

use tracing::trace;

use omop_model::{
    CdmTable, ConceptMap, DateBinding, IdentityBinding, PERSON_TABLE, RowDraft, RuleGroup,
    SourcePlan, SourceRow, TargetPlan,
};

use crate::datetime::parse_source_date;
use crate::metrics::{CountKind, Metrics, MetricsKey};
use crate::redact::redact_value;

/// A draft row plus the source field it is attributed to in the audit.
#[derive(Debug, Clone)]
pub struct BuiltRecord {
    pub source_field: String,
    pub draft: RowDraft,
}

/// Per-run builder state. The person cache is scoped to one builder so
/// separate runs can never leak dedup state into each other.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    seen_persons: HashSet<(String, String)>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build all draft rows for one (source row, target table) pair.
    pub fn build(
        &mut self,
        row: &SourceRow,
        source_plan: &SourcePlan,
        target_plan: &TargetPlan,
        table: &CdmTable,
        metrics: &mut Metrics,
    ) -> Vec<BuiltRecord> {
        if target_plan.target_table == PERSON_TABLE {
            self.build_person(row, source_plan, target_plan, table, metrics)
        } else {
            self.build_event(row, source_plan, target_plan, table, metrics)
        }
    }

    /// Standard path: every data column emits independently.
    fn build_event(
        &mut self,
        row: &SourceRow,
        source_plan: &SourcePlan,
        target_plan: &TargetPlan,
        table: &CdmTable,
        metrics: &mut Metrics,
    ) -> Vec<BuiltRecord> {
        let mut records = Vec::new();
        for column in &target_plan.data_columns {
            let key = MetricsKey::aggregate(
                &source_plan.source_table,
                &column.source_field,
                &table.name,
            );
            metrics.increment(key.clone(), CountKind::Input);
            let raw_value = row.get(&column.source_field);
            let value = raw_value.trim();
            if value.is_empty() {
                metrics.increment(key, CountKind::InvalidSourceField);
                continue;
            }

            // A group is applicable when its term resolves the value or it
            // has copy-through fields to fall back on.
            let applicable: Vec<(&RuleGroup, Option<&ConceptMap>)> = column
                .groups
                .iter()
                .filter_map(|group| {
                    let branch = group.term.as_ref().and_then(|term| term.resolve(value));
                    if branch.is_none() && group.term.is_some() && group.copy_fields.is_empty() {
                        return None;
                    }
                    Some((group, branch))
                })
                .collect();
            if applicable.is_empty() {
                // Unmapped value, no wildcard, nothing to copy through.
                trace!(
                    source_field = column.source_field,
                    value = redact_value(value),
                    "unmapped value; no record"
                );
                metrics.increment(key, CountKind::InvalidSourceField);
                continue;
            }
            // The date does not depend on the group; a bad date is one
            // rejection for the whole column, however many groups it has.
            let date_writes = match date_writes(row, target_plan.date.as_ref(), table) {
                Ok(writes) => writes,
                Err(()) => {
                    metrics.increment(key, CountKind::InvalidDate);
                    continue;
                }
            };
            for (group, branch) in applicable {
                for mut draft in expand(table, branch) {
                    apply_copies(&mut draft, table, &group.copy_fields, raw_value);
                    apply_identity(&mut draft, table, target_plan.identity.as_ref(), row);
                    for (index, value) in &date_writes {
                        draft.set(*index, value.clone());
                    }
                    records.push(BuiltRecord {
                        source_field: column.source_field.clone(),
                        draft,
                    });
                }
            }
        }
        records
    }

    /// Person path: at most one emission per source row, merging the
    /// contributions of every data column, deduplicated per raw person id
    /// for the lifetime of the run.
    fn build_person(
        &mut self,
        row: &SourceRow,
        source_plan: &SourcePlan,
        target_plan: &TargetPlan,
        table: &CdmTable,
        metrics: &mut Metrics,
    ) -> Vec<BuiltRecord> {
        let raw_id = row.get(&source_plan.person_id_field);
        let cache_key = (
            source_plan.source_table.clone(),
            raw_id.trim().to_string(),
        );
        if self.seen_persons.contains(&cache_key) {
            return Vec::new();
        }
        self.seen_persons.insert(cache_key);

        let mut merged = ConceptMap::new();
        let mut copies: Vec<(String, String)> = Vec::new();
        let mut matched = false;
        for column in &target_plan.data_columns {
            let key = MetricsKey::aggregate(
                &source_plan.source_table,
                &column.source_field,
                &table.name,
            );
            metrics.increment(key.clone(), CountKind::Input);
            let raw_value = row.get(&column.source_field);
            let value = raw_value.trim();
            if value.is_empty() {
                metrics.increment(key, CountKind::InvalidSourceField);
                continue;
            }
            let mut column_matched = false;
            for group in &column.groups {
                let branch = group.term.as_ref().and_then(|term| term.resolve(value));
                if branch.is_none() && group.term.is_some() && group.copy_fields.is_empty() {
                    continue;
                }
                if let Some(map) = branch {
                    for (dest, ids) in map {
                        // First contribution to a destination field wins.
                        merged.entry(dest.clone()).or_insert_with(|| ids.clone());
                    }
                }
                for dest in &group.copy_fields {
                    copies.push((dest.clone(), raw_value.to_string()));
                }
                column_matched = true;
            }
            if column_matched {
                matched = true;
            } else {
                // No group could use the value; one rejection per column.
                metrics.increment(key, CountKind::InvalidSourceField);
            }
        }
        if !matched {
            return Vec::new();
        }

        let identity_key = MetricsKey::for_source(&source_plan.person_id_ref(), &table.name);
        let date_writes = match date_writes(row, target_plan.date.as_ref(), table) {
            Ok(writes) => writes,
            Err(()) => {
                metrics.increment(identity_key, CountKind::InvalidDate);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for mut draft in expand(table, Some(&merged)) {
            for (dest, value) in &copies {
                if let Some(index) = table.column_index(dest) {
                    draft.set(index, value.clone());
                }
            }
            apply_identity(&mut draft, table, target_plan.identity.as_ref(), row);
            for (index, value) in &date_writes {
                draft.set(*index, value.clone());
            }
            records.push(BuiltRecord {
                source_field: source_plan.person_id_field.clone(),
                draft,
            });
        }
        records
    }
}

/// Expand one value branch combinatorially.
///
/// The row count is the longest concept list in the branch; a field with
/// fewer values repeats its last value for the remaining rows. This is
/// the only place a single rule match produces more than one row.
pub fn expand(table: &CdmTable, branch: Option<&ConceptMap>) -> Vec<RowDraft> {
    let width = branch.map_or(1, expansion_width);
    let mut drafts = Vec::with_capacity(width);
    for i in 0..width {
        let mut draft = RowDraft::seeded(table);
        if let Some(map) = branch {
            for (dest, ids) in map {
                let Some(&id) = ids.get(i.min(ids.len().saturating_sub(1))) else {
                    continue;
                };
                if let Some(index) = table.column_index(dest) {
                    draft.set(index, id.to_string());
                }
            }
        }
        drafts.push(draft);
    }
    drafts
}

/// Number of output rows a branch expands to.
pub fn expansion_width(branch: &ConceptMap) -> usize {
    branch.values().map(Vec::len).max().unwrap_or(1).max(1)
}

fn apply_copies(draft: &mut RowDraft, table: &CdmTable, copy_fields: &[String], raw_value: &str) {
    for dest in copy_fields {
        if let Some(index) = table.column_index(dest) {
            draft.set(index, raw_value);
        }
    }
}

fn apply_identity(
    draft: &mut RowDraft,
    table: &CdmTable,
    identity: Option<&IdentityBinding>,
    row: &SourceRow,
) {
    let Some(binding) = identity else {
        return;
    };
    if let Some(index) = table.column_index(&binding.dest_field) {
        // Raw identifier, verbatim; surrogate substitution happens in the
        // allocator stage.
        draft.set(index, row.get(&binding.source_field));
    }
}

/// Resolve every date destination into (column index, value) writes.
/// A component destination failing to parse fails the whole row.
fn date_writes(
    row: &SourceRow,
    date: Option<&DateBinding>,
    table: &CdmTable,
) -> Result<Vec<(usize, String)>, ()> {
    let Some(binding) = date else {
        return Ok(Vec::new());
    };
    let raw = row.get(&binding.source_field);
    let mut writes = Vec::new();
    for dest in &binding.dest_fields {
        let Some(index) = table.column_index(dest) else {
            continue;
        };
        if let Some(components) = table.date_components.get(dest) {
            let date = parse_source_date(raw).ok_or_else(|| {
                trace!(
                    source_field = binding.source_field,
                    value = redact_value(raw),
                    "date matches no known format"
                );
            })?;
            writes.push((index, date.datetime_string()));
            for (column, value) in [
                (&components.year, date.year.to_string()),
                (&components.month, date.month.to_string()),
                (&components.day, date.day.to_string()),
            ] {
                if let Some(sub_index) = table.column_index(column) {
                    writes.push((sub_index, value));
                }
            }
        } else if let Some(sibling) = table.linked_dates.get(dest) {
            writes.push((index, raw.to_string()));
            if let Some(sibling_index) = table.column_index(sibling) {
                writes.push((sibling_index, raw.chars().take(10).collect()));
            }
        } else {
            writes.push((index, raw.to_string()));
        }
    }
    Ok(writes)
}
