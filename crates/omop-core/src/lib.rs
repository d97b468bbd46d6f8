#![deny(unsafe_code)]

//! Core row-processing engine: record building, identity registration,
//! id allocation, metrics, and the run orchestrator.

pub mod allocator;
pub mod builder;
pub mod datetime;
pub mod identity;
pub mod metrics;
pub mod pipeline;
pub mod redact;

pub use allocator::RecordAllocator;
pub use builder::{BuiltRecord, RecordBuilder, expand, expansion_width};
pub use datetime::{SourceDate, normalize_datetime, parse_source_date};
pub use identity::{IdentityRegistry, PersonRegistration};
pub use metrics::{CountKind, Counters, Metrics, MetricsKey, SummaryRow};
pub use pipeline::{Pipeline, Sinks, Sources};
pub use redact::{REDACTED_VALUE, log_data_enabled, redact_value, set_log_data};
