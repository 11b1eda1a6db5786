//! osq-glance - safe, bounded SQL access to osquery.

mod cli;

use std::sync::Arc;

use cli::{Cli, Command, OutputFormat};
use osq_glance::config::Config;
use osq_glance::db::QueryResult;
use osq_glance::error::{OsqError, Result};
use osq_glance::logging;
use osq_glance::QueryService;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging(cli.log_level());
    } else {
        logging::init_stderr_logging(cli.log_level());
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    // CLI flags win; environment only fills what the config file left unset
    cli.apply_overrides(&mut config.osquery);
    config.osquery.apply_env_defaults();
    config.osquery.validate()?;

    let service = Arc::new(QueryService::with_executor(config.osquery));

    let canceller = Arc::clone(&service);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !interrupt(&canceller) {
                std::process::exit(130);
            }
        }
    });

    match cli.command {
        Command::Query { sql, format } => {
            let result = service.execute(&sql).await?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&result.rows).map_err(|e| {
                        OsqError::internal(format!("Failed to encode rows: {e}"))
                    })?;
                    println!("{json}");
                }
                OutputFormat::Text => print!("{}", render_table(&result)),
            }
        }
        Command::Tables => {
            for table in service.list_tables().await? {
                println!("{table}");
            }
        }
        Command::Schema { tables } => {
            println!("{}", service.get_schema(&tables).await?);
        }
        Command::Status => {
            let available = service.is_available().await;
            println!(
                "osquery: {}",
                if available { "available" } else { "unavailable" }
            );
            println!(
                "extension tables: {}",
                if service.extension_tables_loadable() {
                    "loadable"
                } else {
                    "not loadable"
                }
            );
            if !available {
                return Err(OsqError::not_found("osqueryi could not be launched"));
            }
        }
    }

    Ok(())
}

/// Cancels the running invocation on Ctrl-C.
///
/// Returns false when nothing is running, so the interrupt ends the process.
fn interrupt(service: &QueryService) -> bool {
    if !service.is_busy() {
        return false;
    }
    debug!("Interrupt received, cancelling");
    service.cancel_current();
    true
}

/// Renders rows as an aligned text table with a row count footer.
fn render_table(result: &QueryResult) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .map(|col| row.get(col).map(|v| v.to_display_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    if !result.columns.is_empty() {
        out.push_str(&format_line(&result.columns));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("-+-"));
        out.push('\n');
        for row in &cells {
            out.push_str(&format_line(row));
            out.push('\n');
        }
    }
    out.push_str(&format!(
        "({} row{})\n",
        result.row_count,
        if result.row_count == 1 { "" } else { "s" }
    ));
    out
}
