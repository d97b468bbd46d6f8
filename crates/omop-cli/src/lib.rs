//! CLI library components for the OMOP transformation engine.

pub mod logging;
