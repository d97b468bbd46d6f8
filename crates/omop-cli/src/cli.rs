//! CLI argument definitions for the OMOP transformation engine.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "omop-etl",
    version,
    about = "Transform raw source tables into OMOP CDM datasets",
    long_about = "Compile declarative mapping rules and apply them to raw source\n\
                  tables, producing CDM-conformant TSV outputs with pseudonymised\n\
                  person identifiers and a per-field audit summary."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow raw person-level values in trace logs.
    ///
    /// Off by default: source identifiers and cell values are replaced
    /// with a redaction token before they reach any log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a transformation over an input directory.
    Run(RunArgs),

    /// List the CDM target tables defined by a schema.
    Tables(TablesArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the mapping-rules JSON document.
    #[arg(value_name = "RULES")]
    pub rules: PathBuf,

    /// Directory containing the raw source tables (CSV or TSV).
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// CDM DDL file defining the target tables.
    #[arg(long = "ddl", value_name = "PATH")]
    pub ddl: PathBuf,

    /// Per-table schema configuration (person-id columns, autonumber
    /// columns, date decomposition).
    #[arg(long = "schema-config", value_name = "PATH")]
    pub schema_config: Option<PathBuf>,

    /// Output directory for generated files (default: <INPUT_DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Reuse raw person identifiers as surrogates instead of allocating
    /// sequential ones.
    #[arg(long = "passthrough-ids")]
    pub passthrough_ids: bool,
}

#[derive(Parser)]
pub struct TablesArgs {
    /// CDM DDL file defining the target tables.
    #[arg(long = "ddl", value_name = "PATH")]
    pub ddl: PathBuf,

    /// Per-table schema configuration.
    #[arg(long = "schema-config", value_name = "PATH")]
    pub schema_config: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
