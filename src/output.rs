//! Non-interactive mode: run one query and print the outcome

use crate::api::ODataClient;
use crate::error::QueryError;
use crate::export::{export_results, ExportFormat};
use crate::models::{ODataResult, QueryConfig, QueryResult};
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use std::io::Write;
use std::path::PathBuf;

/// How the headless run presents its records
#[derive(Debug, Clone, Default)]
pub struct PrintOptions {
    /// Print the records as JSON instead of a table
    pub json: bool,
    /// Also write the result set to this file
    pub export: Option<PathBuf>,
}

/// Process exit codes of a headless run
pub mod exit {
    pub const OK: u8 = 0;
    pub const FAILED: u8 = 1;
    pub const MISSING_CREDENTIAL: u8 = 2;
}

/// Run the query once and report to stdout/stderr
pub async fn run_once(client: &ODataClient, config: &QueryConfig, opts: &PrintOptions) -> Result<u8> {
    let mut stderr = std::io::stderr();
    if config.has_credential() {
        writeln!(stderr, "Requesting: {}", config.build_url())?;
    }

    let outcome = client.execute_query(config).await;
    report(&outcome, opts, &mut std::io::stdout(), &mut stderr)
}

/// Write the outcome of a query; returns the exit code
pub fn report(
    outcome: &Result<ODataResult, QueryError>,
    opts: &PrintOptions,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<u8> {
    match outcome {
        Ok(ODataResult::Rows(records)) => {
            writeln!(err, "Fetched {} records", records.len())?;
            let table = QueryResult::from_records(records);

            if opts.json {
                writeln!(out, "{}", serde_json::to_string_pretty(records)?)?;
            } else {
                writeln!(out, "{}", render_table(&table))?;
            }

            if let Some(path) = &opts.export {
                let written = export_results(&table, ExportFormat::from_path(path), path)?;
                writeln!(err, "Exported to {}", written)?;
            }
            Ok(exit::OK)
        }
        Ok(ODataResult::Empty) => {
            writeln!(
                err,
                "Request succeeded but returned no data (it may have been filtered out)"
            )?;
            Ok(exit::OK)
        }
        Ok(ODataResult::Failure { status, body }) => {
            writeln!(err, "Request failed: {}", status)?;
            writeln!(err, "{}", body)?;
            Ok(exit::FAILED)
        }
        Err(e @ QueryError::MissingCredential) => {
            writeln!(err, "Error: {} (pass --api-key or set ODATA_API_KEY)", e)?;
            Ok(exit::MISSING_CREDENTIAL)
        }
        Err(e) => {
            writeln!(err, "Error: {}", e)?;
            Ok(exit::FAILED)
        }
    }
}

/// Render the result set as a text table
pub fn render_table(result: &QueryResult) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(result.columns.clone());

    for row in &result.rows {
        table.add_row(row.clone());
    }

    table.to_string()
}
