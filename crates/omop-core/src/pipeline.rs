//! The row-synchronous orchestrator: streams each source table through the
//! record builder, allocates ids, resolves person identities, and writes
//! accepted rows to the per-target sinks.
//!
//! One source table is fully drained before the next begins. Tables
//! feeding the person target go first so every later identity resolution
//! sees a populated registry.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{info, info_span, trace, warn};

use omop_model::{
    ExecutionPlan, PERSON_TABLE, RowSink, RowSource, SchemaLookup, SourcePlan,
};

use crate::allocator::RecordAllocator;
use crate::builder::RecordBuilder;
use crate::identity::{IdentityRegistry, PersonRegistration};
use crate::metrics::{CountKind, Metrics, MetricsKey};
use crate::redact::redact_value;

/// Row sources keyed by source table, sinks keyed by target table.
pub type Sources = BTreeMap<String, Box<dyn RowSource>>;
pub type Sinks = BTreeMap<String, Box<dyn RowSink>>;

pub struct Pipeline<'a> {
    plan: &'a ExecutionPlan,
    schema: &'a SchemaLookup,
    registry: IdentityRegistry,
    allocator: RecordAllocator,
    metrics: Metrics,
    builder: RecordBuilder,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        plan: &'a ExecutionPlan,
        schema: &'a SchemaLookup,
        registry: IdentityRegistry,
        allocator: RecordAllocator,
    ) -> Self {
        let metrics = Metrics::new(&plan.dataset);
        Self {
            plan,
            schema,
            registry,
            allocator,
            metrics,
            builder: RecordBuilder::new(),
        }
    }

    /// Run the whole transformation. Missing row sources are reported and
    /// skipped; a missing sink for a reachable target is a caller bug and
    /// fails the run.
    pub fn run(&mut self, sources: &mut Sources, sinks: &mut Sinks) -> Result<()> {
        for target in self.plan.target_tables() {
            let table = self
                .schema
                .table(target)
                .with_context(|| format!("target table '{target}' missing from schema"))?;
            let sink = sinks
                .get_mut(target)
                .with_context(|| format!("no sink for target table '{target}'"))?;
            sink.write_header(table.columns())?;
        }

        for source_plan in self.plan.sources_person_first() {
            let Some(source) = sources.get_mut(&source_plan.source_table) else {
                warn!(
                    source_table = source_plan.source_table,
                    "no row source; skipping"
                );
                continue;
            };
            let span = info_span!("source_table", name = %source_plan.source_table);
            let _guard = span.enter();
            let rows = drain_source(
                source_plan,
                source.as_mut(),
                sinks,
                self.schema,
                &mut self.registry,
                &mut self.allocator,
                &mut self.metrics,
                &mut self.builder,
            )?;
            info!(rows, "source table drained");
        }

        for sink in sinks.values_mut() {
            sink.finish()?;
        }
        Ok(())
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Tear down into the state that outlives the run and gets persisted.
    pub fn into_parts(self) -> (IdentityRegistry, RecordAllocator, Metrics) {
        (self.registry, self.allocator, self.metrics)
    }
}

#[allow(clippy::too_many_arguments)]
fn drain_source(
    source_plan: &SourcePlan,
    source: &mut dyn RowSource,
    sinks: &mut Sinks,
    schema: &SchemaLookup,
    registry: &mut IdentityRegistry,
    allocator: &mut RecordAllocator,
    metrics: &mut Metrics,
    builder: &mut RecordBuilder,
) -> Result<u64> {
    let mut rows = 0u64;
    while let Some(row) = source.next_row()? {
        rows += 1;
        if source_plan.feeds_person() {
            let raw_id = row.get(&source_plan.person_id_field);
            let birth_date = row.get(&source_plan.datetime_field);
            if registry.register(raw_id, birth_date) == PersonRegistration::Rejected {
                trace!(
                    raw_id = redact_value(raw_id),
                    birth_date = redact_value(birth_date),
                    "person registration rejected"
                );
                // Not a valid person source row; none of this row's
                // targets can ever resolve, so reject it once here.
                metrics.increment(
                    MetricsKey::for_source(&source_plan.person_id_ref(), PERSON_TABLE),
                    CountKind::InvalidPersonId,
                );
                continue;
            }
        }
        for (target_name, target_plan) in &source_plan.targets {
            let table = schema
                .table(target_name)
                .with_context(|| format!("target table '{target_name}' missing from schema"))?;
            let records = builder.build(&row, source_plan, target_plan, table, metrics);
            for record in records {
                let mut draft = record.draft;
                // Ids are consumed before identity resolution on purpose:
                // discarded rows leave gaps, and resumed runs seeded from
                // the persisted counters can never collide.
                if let Some(auto_column) = &table.autonumber_column
                    && let Some(index) = table.column_index(auto_column)
                {
                    draft.set(index, allocator.next_id(target_name).to_string());
                }
                if let Some(person_column) = &table.person_id_column
                    && let Some(index) = table.column_index(person_column)
                {
                    let raw = draft.get(index).to_string();
                    match registry.resolve(&raw) {
                        Some(surrogate) => {
                            let surrogate = surrogate.to_string();
                            draft.set(index, surrogate);
                        }
                        None => {
                            trace!(
                                target_table = target_name,
                                raw_id = redact_value(&raw),
                                "unresolved person id; row discarded"
                            );
                            metrics.increment(
                                MetricsKey::aggregate(
                                    &source_plan.source_table,
                                    &record.source_field,
                                    target_name,
                                ),
                                CountKind::InvalidPersonId,
                            );
                            continue;
                        }
                    }
                }
                let sink = sinks
                    .get_mut(target_name)
                    .with_context(|| format!("no sink for target table '{target_name}'"))?;
                sink.write_row(&draft.into_values())?;
                metrics.increment(
                    MetricsKey::aggregate(
                        &source_plan.source_table,
                        &record.source_field,
                        target_name,
                    ),
                    CountKind::Output,
                );
            }
        }
    }
    Ok(rows)
}
