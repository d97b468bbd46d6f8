#![deny(unsafe_code)]

//! Parsing and compilation of mapping-rules documents into execution plans.

pub mod compiler;
pub mod document;
pub mod error;

pub use compiler::compile;
pub use document::{
    ConceptIds, ConceptMappingEntry, DateMapping, GroupDocument, LegacyBinding, LegacyTermMapping,
    PersonIdMapping, RulesDocument, StructuredGroup, parse_document,
};
pub use error::CompileError;
