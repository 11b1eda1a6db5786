//! Command-line argument parsing for osq-glance.

use clap::{Parser, Subcommand};
use osq_glance::config::OsqueryConfig;
use std::path::PathBuf;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Text,
    /// JSON array of row objects.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Safe, bounded SQL access to osquery.
#[derive(Parser, Debug)]
#[command(name = "osq-glance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Path to osqueryi
    #[arg(long, value_name = "PATH", global = true)]
    pub binary: Option<PathBuf>,

    /// Path to the bundled extension
    #[arg(long, value_name = "PATH", global = true)]
    pub extension: Option<PathBuf>,

    /// Do not load extension tables
    #[arg(long, global = true)]
    pub no_extension: bool,

    /// Query timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a read-only SQL query
    Query {
        /// SQL text (SELECT, PRAGMA or EXPLAIN)
        sql: String,

        /// Output format: text or json
        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,
    },
    /// List available tables
    Tables,
    /// Print CREATE TABLE text for tables
    Schema {
        /// Table names
        #[arg(required = true)]
        tables: Vec<String>,
    },
    /// Check whether osquery can be launched
    Status,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(osq_glance::config::Config::default_path)
    }

    /// Applies CLI overrides on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut OsqueryConfig) {
        if let Some(binary) = &self.binary {
            config.binary = Some(binary.clone());
        }
        if let Some(extension) = &self.extension {
            config.extension = Some(extension.clone());
        }
        if self.no_extension {
            config.extension_enabled = false;
        }
        if let Some(timeout) = self.timeout {
            config.query_timeout_secs = timeout;
        }
    }

    /// Returns the default log level for this invocation.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
