//! The osquery query service.
//!
//! Validates SQL, decides how osquery is launched for each call, runs it
//! through a [`ProcessRunner`] and decodes the output.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::args::{
    build_invocation, ArchForcing, InvocationSpec, LaunchEnvironment, LaunchMode, OutputMode,
};
use super::extension::{extension_schema, extension_table_names, is_extension_table};
use super::paths::{daemon_socket, resolve_binary, resolve_extension};
use super::sockets::{sweep_stale_sockets, ExtensionSocket};
use crate::config::OsqueryConfig;
use crate::db::{
    extract_schema_blocks, parse_json_rows, parse_table_list, QueryResult, TableSchema,
};
use crate::error::{OsqError, Result};
use crate::process::{ProcessExecutor, ProcessInvocation, ProcessOutcome, ProcessRunner};
use crate::safety::SqlValidator;

const TABLES_COMMAND: &str = ".tables";
const SCHEMA_COMMAND: &str = ".schema";
const VERSION_FLAG: &str = "--version";

/// Entry point for everything that talks to osquery.
///
/// Holds no per-call state: extension presence and the daemon socket are
/// checked again on every call.
pub struct QueryService {
    runner: Arc<dyn ProcessRunner>,
    config: OsqueryConfig,
    extension_enabled: AtomicBool,
    validator: SqlValidator,
}

impl QueryService {
    /// Creates a service and sweeps stale sockets left by earlier runs.
    pub fn new(runner: Arc<dyn ProcessRunner>, config: OsqueryConfig) -> Self {
        sweep_stale_sockets(&config.socket_dir, config.stale_socket_age());
        let extension_enabled = AtomicBool::new(config.extension_enabled);
        Self {
            runner,
            config,
            extension_enabled,
            validator: SqlValidator::new(),
        }
    }

    /// Creates a service backed by a real [`ProcessExecutor`].
    pub fn with_executor(config: OsqueryConfig) -> Self {
        Self::new(Arc::new(ProcessExecutor::new()), config)
    }

    /// Turns extension-backed tables on or off for subsequent calls.
    pub fn set_extension_enabled(&self, enabled: bool) {
        self.extension_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn extension_enabled(&self) -> bool {
        self.extension_enabled.load(Ordering::SeqCst)
    }

    /// Returns true if extension tables can be loaded right now.
    pub fn extension_tables_loadable(&self) -> bool {
        self.loadable_extension().is_some()
    }

    fn loadable_extension(&self) -> Option<std::path::PathBuf> {
        if !self.extension_enabled() {
            return None;
        }
        resolve_extension(&self.config)
    }

    /// Validates and executes a query, returning its rows.
    ///
    /// Nothing is spawned if validation fails.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let sql = self.validator.validate(sql)?;
        let start = Instant::now();

        let outcome = self
            .run_command(sql, OutputMode::Json, true, self.config.query_timeout())
            .await?;
        let rows = parse_json_rows(&outcome.stdout_lossy())?;
        let result = QueryResult::from_rows(rows).with_execution_time(start.elapsed());

        info!(
            "Query returned {} row(s) in {:?}",
            result.row_count, result.execution_time
        );
        Ok(result)
    }

    /// Executes a query and orders its columns by a known table schema.
    pub async fn execute_with_schema(
        &self,
        sql: &str,
        schema: &TableSchema,
    ) -> Result<QueryResult> {
        Ok(self.execute(sql).await?.ordered_by_schema(schema))
    }

    /// Lists every table osquery can answer, sorted and deduplicated.
    ///
    /// Extension tables are added from the static list when loadable, since
    /// `.tables` never shows them.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let outcome = self
            .run_command(
                TABLES_COMMAND,
                OutputMode::Lines,
                false,
                self.config.meta_timeout(),
            )
            .await?;

        let mut tables: BTreeSet<String> = parse_table_list(&outcome.stdout_lossy())
            .into_iter()
            .collect();
        if self.extension_tables_loadable() {
            tables.extend(extension_table_names().map(str::to_string));
        }

        debug!("Discovered {} table(s)", tables.len());
        Ok(tables.into_iter().collect())
    }

    /// Returns `CREATE TABLE` text for the requested tables.
    ///
    /// Built-in tables come from one `.schema` dump; extension tables use
    /// their static schema. Unknown tables are skipped.
    pub async fn get_schema(&self, tables: &[String]) -> Result<String> {
        if tables.is_empty() {
            return Ok(String::new());
        }

        let native: Vec<String> = tables
            .iter()
            .filter(|t| !is_extension_table(t))
            .cloned()
            .collect();

        let mut blocks: Vec<String> = Vec::new();
        if !native.is_empty() {
            let outcome = self
                .run_command(
                    SCHEMA_COMMAND,
                    OutputMode::Lines,
                    false,
                    self.config.meta_timeout(),
                )
                .await?;
            blocks.extend(
                extract_schema_blocks(&outcome.stdout_lossy(), &native)
                    .into_iter()
                    .map(|(_, text)| text),
            );
        }

        let mut seen = BTreeSet::new();
        for table in tables {
            if let Some(schema) = extension_schema(table) {
                if seen.insert(table.as_str()) {
                    blocks.push(schema.to_string());
                }
            }
        }

        Ok(blocks.join("\n"))
    }

    /// Like [`Self::get_schema`], parsed into structured schemas.
    pub async fn table_schemas(&self, tables: &[String]) -> Result<Vec<TableSchema>> {
        let text = self.get_schema(tables).await?;
        Ok(parse_schema_text(&text))
    }

    /// Returns true if `osqueryi --version` exits successfully. Never fails.
    pub async fn is_available(&self) -> bool {
        let invocation = ProcessInvocation::new(
            resolve_binary(&self.config),
            vec![VERSION_FLAG.to_string()],
            self.config.probe_timeout(),
        );
        match self.runner.run(invocation).await {
            Ok(outcome) => outcome.success(),
            Err(e) => {
                debug!("osquery unavailable: {e}");
                false
            }
        }
    }

    /// Cancels the in-flight invocation, if any.
    pub fn cancel_current(&self) {
        self.runner.cancel();
    }

    /// Returns true while an osquery invocation is running.
    pub fn is_busy(&self) -> bool {
        self.runner.is_running()
    }

    /// Samples the environment and runs one osquery command.
    ///
    /// Non-zero exits become `ExecutionFailed`.
    async fn run_command(
        &self,
        command: &str,
        output: OutputMode,
        wants_extension: bool,
        timeout: Duration,
    ) -> Result<ProcessOutcome> {
        let environment = LaunchEnvironment {
            extension: if wants_extension {
                self.loadable_extension()
            } else {
                None
            },
            daemon_socket: daemon_socket(&self.config),
        };

        // Held until the run finishes; dropping it removes the socket file.
        let mut socket: Option<ExtensionSocket> = None;
        let mode = environment.launch_mode(|| {
            let allocated = ExtensionSocket::allocate(&self.config.socket_dir)?;
            let path = allocated.path().to_path_buf();
            socket = Some(allocated);
            Ok(path)
        })?;

        let binary = resolve_binary(&self.config);
        let arch = ArchForcing {
            wrapper: self.config.arch_wrapper.clone(),
            arch: self.config.force_arch.clone(),
        };
        let invocation = build_invocation(&InvocationSpec {
            binary: &binary,
            mode: &mode,
            extension_name: &self.config.extension_name,
            output,
            command,
            timeout,
            arch: Some(&arch),
        });

        debug!(
            "Running osquery ({}): {}",
            mode_label(&mode),
            invocation.display_command()
        );
        let outcome = self.runner.run(invocation).await?;
        drop(socket);

        check_exit(outcome)
    }
}

fn mode_label(mode: &LaunchMode) -> &'static str {
    match mode {
        LaunchMode::IsolatedExtension { .. } => "extension",
        LaunchMode::Daemon { .. } => "daemon",
        LaunchMode::Standalone => "standalone",
    }
}

/// Turns a failed or error-reporting outcome into `ExecutionFailed`.
fn check_exit(outcome: ProcessOutcome) -> Result<ProcessOutcome> {
    let stderr = outcome.stderr_lossy();
    let stderr = stderr.trim();

    if outcome.exit_code != 0 {
        let stdout = outcome.stdout_lossy();
        let stdout = stdout.trim();
        let message = if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            format!("exit code {}", outcome.exit_code)
        };
        warn!("osquery failed: {message}");
        return Err(OsqError::execution_failed(message));
    }

    // osqueryi can exit 0 after printing a SQL error and no rows.
    if outcome.stdout.iter().all(u8::is_ascii_whitespace) && stderr.starts_with("Error") {
        warn!("osquery reported an error: {stderr}");
        return Err(OsqError::execution_failed(stderr.to_string()));
    }

    Ok(outcome)
}

/// Parses concatenated `CREATE TABLE` text into schemas, one per statement.
fn parse_schema_text(text: &str) -> Vec<TableSchema> {
    let mut schemas = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if crate::db::table_name_from_create(line).is_some() && !current.is_empty() {
            schemas.extend(TableSchema::parse(&current));
            current.clear();
        }
        current.push_str(line);
        current.push(' ');
    }
    if !current.is_empty() {
        schemas.extend(TableSchema::parse(&current));
    }
    schemas
}
