use crate::models::QueryResult;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick the format from a file extension, CSV unless it ends in `.json`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Export query results to a file
pub fn export_results(results: &QueryResult, format: ExportFormat, path: &Path) -> Result<String> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    match format {
        ExportFormat::Csv => export_to_csv(results, &mut file)?,
        ExportFormat::Json => export_to_json(results, &mut file)?,
    }

    Ok(path.to_string_lossy().to_string())
}

fn export_to_csv(results: &QueryResult, out: &mut impl Write) -> Result<()> {
    let header: Vec<String> = results.columns.iter().map(|c| csv_field(c)).collect();
    writeln!(out, "{}", header.join(","))?;

    for row in &results.rows {
        let line: Vec<String> = row.iter().map(|c| csv_field(c)).collect();
        writeln!(out, "{}", line.join(","))?;
    }

    Ok(())
}

/// Quote a cell when it holds a separator, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn export_to_json(results: &QueryResult, out: &mut impl Write) -> Result<()> {
    // Prefer the records as received; fall back to the display table
    if let Some(raw) = &results.raw_json {
        out.write_all(raw.as_bytes())?;
        return Ok(());
    }

    let mut output = Vec::new();
    for row in &results.rows {
        let mut map = serde_json::Map::new();
        for (col, cell) in results.columns.iter().zip(row) {
            map.insert(col.clone(), serde_json::Value::String(cell.clone()));
        }
        output.push(serde_json::Value::Object(map));
    }

    let json = serde_json::to_string_pretty(&output)?;
    out.write_all(json.as_bytes())?;
    Ok(())
}
