//! Command execution: wiring files, schema, rules, and the run pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use omop_core::{IdentityRegistry, Metrics, Pipeline, RecordAllocator, SummaryRow};
use omop_ingest::{
    FileRowSource, IDENTITY_FILE, RECORD_ID_FILE, TsvRowSink, discover_sources,
    load_identity_table, load_record_id_table, save_identity_table, save_record_id_table,
};
use omop_model::RowSink;
use omop_rules::{compile, parse_document};
use omop_schema::load_schema;

use crate::cli::{RunArgs, TablesArgs};
use crate::types::{RunReport, TargetSummary};

/// Audit summary filename, written next to the target tables.
const SUMMARY_FILE: &str = "summary.tsv";

pub fn run_transform(args: &RunArgs) -> Result<RunReport> {
    let schema = load_schema(&args.ddl, args.schema_config.as_deref())?;
    let rules_text = fs::read_to_string(&args.rules)
        .with_context(|| format!("failed to read rules {}", args.rules.display()))?;
    let document = parse_document(&rules_text)?;
    let plan = compile(&document, &schema)?;
    info!(
        dataset = plan.dataset,
        sources = plan.sources.len(),
        skipped = plan.skipped.len(),
        "rules compiled"
    );

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.input_dir.join("output"));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;

    let matched = discover_sources(&args.input_dir, plan.sources.keys().map(String::as_str))?;
    let mut sources: omop_core::Sources = BTreeMap::new();
    for (table, path) in matched {
        sources.insert(
            table.clone(),
            Box::new(FileRowSource::open(table, &path)?),
        );
    }

    let mut sinks: omop_core::Sinks = BTreeMap::new();
    for target in plan.target_tables() {
        let path = output_dir.join(format!("{target}.tsv"));
        sinks.insert(target.to_string(), Box::new(TsvRowSink::create(&path)?));
    }

    let identity_path = output_dir.join(IDENTITY_FILE);
    let registry =
        IdentityRegistry::from_entries(load_identity_table(&identity_path)?, args.passthrough_ids);
    if !registry.is_empty() {
        info!(persons = registry.len(), "resumed identity side-table");
    }
    let record_id_path = output_dir.join(RECORD_ID_FILE);
    let allocator = RecordAllocator::from_entries(load_record_id_table(&record_id_path)?);

    let mut pipeline = Pipeline::new(&plan, &schema, registry, allocator);
    pipeline.run(&mut sources, &mut sinks)?;
    let (registry, allocator, metrics) = pipeline.into_parts();

    save_identity_table(&identity_path, registry.entries())?;
    save_record_id_table(&record_id_path, allocator.entries())?;
    let summary_path = output_dir.join(SUMMARY_FILE);
    write_summary(&summary_path, &metrics)?;

    let targets = plan
        .target_tables()
        .into_iter()
        .map(|target| TargetSummary {
            target: target.to_string(),
            written: metrics.output_total(target),
            rejected: metrics.rejected_total(target),
        })
        .collect();
    Ok(RunReport {
        dataset: plan.dataset.clone(),
        output_dir,
        summary_path,
        targets,
        skipped: plan
            .skipped
            .iter()
            .map(|s| (s.source_table.clone(), s.reason.clone()))
            .collect(),
        persons: registry.len(),
    })
}

fn write_summary(path: &Path, metrics: &Metrics) -> Result<()> {
    let mut sink = TsvRowSink::create(path)?;
    let header: Vec<String> = SummaryRow::HEADER.iter().map(|h| (*h).to_string()).collect();
    sink.write_header(&header)?;
    for row in metrics.summary_rows() {
        sink.write_row(&row.to_record())?;
    }
    sink.finish()?;
    Ok(())
}

pub fn run_tables(args: &TablesArgs) -> Result<()> {
    let schema = load_schema(&args.ddl, args.schema_config.as_deref())?;
    crate::summary::print_tables(&schema);
    let count = schema.table_names().count();
    if count == 0 {
        warn!("schema defines no tables");
    }
    Ok(())
}
