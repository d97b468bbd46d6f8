//! Per-field accounting. Every source row's fate per target table lands
//! in exactly one counter, so the flattened summary is a complete audit of
//! the run.

use std::collections::BTreeMap;

use omop_model::FieldRef;

/// What happened to a (row, target table) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CountKind {
    /// Source row seen by a data column.
    Input,
    /// Blank or unmappable source value.
    InvalidSourceField,
    /// Date value matching no known format.
    InvalidDate,
    /// Person identifier that could not be registered or resolved.
    InvalidPersonId,
    /// Row accepted and written.
    Output,
}

/// Counter key: where the count came from and what it concerns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MetricsKey {
    pub source_table: String,
    pub source_field: String,
    pub target_table: String,
    /// Concept value the count is attributed to; `"all"` for aggregates.
    pub concept: String,
}

impl MetricsKey {
    pub fn aggregate(source_table: &str, source_field: &str, target_table: &str) -> Self {
        Self {
            source_table: source_table.to_string(),
            source_field: source_field.to_string(),
            target_table: target_table.to_string(),
            concept: "all".to_string(),
        }
    }

    /// Aggregate key for a qualified source field.
    pub fn for_source(field: &FieldRef, target_table: &str) -> Self {
        Self::aggregate(&field.table, &field.field, target_table)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub input: u64,
    pub invalid_person: u64,
    pub invalid_date: u64,
    pub invalid_source: u64,
    pub output: u64,
}

/// One line of the flattened audit summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub dataset: String,
    pub source: String,
    pub source_field: String,
    pub target: String,
    pub concept_id: String,
    pub additional: String,
    pub counters: Counters,
}

impl SummaryRow {
    pub const HEADER: [&'static str; 11] = [
        "dataset",
        "source",
        "source_field",
        "target",
        "concept_id",
        "additional",
        "input",
        "invalid_person",
        "invalid_date",
        "invalid_source",
        "output",
    ];

    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.dataset.clone(),
            self.source.clone(),
            self.source_field.clone(),
            self.target.clone(),
            self.concept_id.clone(),
            self.additional.clone(),
            self.counters.input.to_string(),
            self.counters.invalid_person.to_string(),
            self.counters.invalid_date.to_string(),
            self.counters.invalid_source.to_string(),
            self.counters.output.to_string(),
        ]
    }
}

/// Accumulator for the whole run. Single writer; flattening is read-only.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    dataset: String,
    counts: BTreeMap<MetricsKey, Counters>,
}

impl Metrics {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            counts: BTreeMap::new(),
        }
    }

    pub fn increment(&mut self, key: MetricsKey, kind: CountKind) {
        let counters = self.counts.entry(key).or_default();
        match kind {
            CountKind::Input => counters.input += 1,
            CountKind::InvalidSourceField => counters.invalid_source += 1,
            CountKind::InvalidDate => counters.invalid_date += 1,
            CountKind::InvalidPersonId => counters.invalid_person += 1,
            CountKind::Output => counters.output += 1,
        }
    }

    pub fn get(&self, key: &MetricsKey) -> Counters {
        self.counts.get(key).copied().unwrap_or_default()
    }

    /// Total accepted rows for one target table.
    pub fn output_total(&self, target_table: &str) -> u64 {
        self.counts
            .iter()
            .filter(|(key, _)| key.target_table == target_table)
            .map(|(_, c)| c.output)
            .sum()
    }

    /// Total rejected rows for one target table, across rejection kinds.
    pub fn rejected_total(&self, target_table: &str) -> u64 {
        self.counts
            .iter()
            .filter(|(key, _)| key.target_table == target_table)
            .map(|(_, c)| c.invalid_person + c.invalid_date + c.invalid_source)
            .sum()
    }

    /// Flatten into summary rows, ordered by key.
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.counts
            .iter()
            .map(|(key, counters)| SummaryRow {
                dataset: self.dataset.clone(),
                source: key.source_table.clone(),
                source_field: key.source_field.clone(),
                target: key.target_table.clone(),
                concept_id: key.concept.clone(),
                additional: "all".to_string(),
                counters: *counters,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_field_key_aggregates() {
        let field = FieldRef::new("demo.csv", "id");
        assert_eq!(
            MetricsKey::for_source(&field, "person"),
            MetricsKey::aggregate("demo.csv", "id", "person")
        );
    }

    #[test]
    fn counters_accumulate_by_kind() {
        let mut metrics = Metrics::new("demo");
        let key = MetricsKey::aggregate("demo.csv", "sex", "person");
        metrics.increment(key.clone(), CountKind::Input);
        metrics.increment(key.clone(), CountKind::Input);
        metrics.increment(key.clone(), CountKind::Output);
        let counters = metrics.get(&key);
        assert_eq!(counters.input, 2);
        assert_eq!(counters.output, 1);
        assert_eq!(counters.invalid_source, 0);
    }

    #[test]
    fn summary_flattens_every_key() {
        let mut metrics = Metrics::new("demo");
        metrics.increment(
            MetricsKey::aggregate("demo.csv", "sex", "person"),
            CountKind::Output,
        );
        metrics.increment(
            MetricsKey::aggregate("labs.csv", "result", "measurement"),
            CountKind::InvalidDate,
        );
        let rows = metrics.summary_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].dataset, "demo");
        assert_eq!(rows[1].counters.invalid_date, 1);
    }
}
