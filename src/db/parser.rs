//! Parsers for osquery shell output.
//!
//! Each function handles one output shape: JSON result sets (with recovery
//! from noisy output), `.tables` listings and `.schema` dumps.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::ResultRow;
use crate::error::{OsqError, Result};

fn table_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*=>\s*(\S+)\s*$").expect("valid table list regex"))
}

fn create_table_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)^\s*CREATE\s+(?:VIRTUAL\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[A-Za-z0-9_]+\.)?[`"\[]?([A-Za-z0-9_]+)[`"\]]?"#,
        )
        .expect("valid create table regex")
    })
}

/// Decodes osquery `--json` output into rows.
///
/// Empty output is an empty result set. If the text is not a JSON array, the
/// slice between the first `[` and the last `]` is tried once more, which
/// drops warnings printed before or after the array.
pub fn parse_json_rows(raw: &str) -> Result<Vec<ResultRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let values = match serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
        Ok(values) => values,
        Err(first_err) => {
            let recovered = recover_json_array(trimmed)
                .and_then(|slice| serde_json::from_str::<Vec<serde_json::Value>>(slice).ok());
            match recovered {
                Some(values) => values,
                None => {
                    return Err(OsqError::parse(
                        format!("Output is not a JSON array: {first_err}"),
                        raw,
                    ))
                }
            }
        }
    };

    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            serde_json::Value::Object(object) => Ok(ResultRow::from_json_object(object)),
            other => Err(OsqError::parse(
                format!("Row {idx} is not a JSON object: {other}"),
                raw,
            )),
        })
        .collect()
}

/// Returns the text from the first `[` to the last `]`, if both exist in order.
///
/// Brackets inside string values that precede the real array defeat this;
/// the caller reports a parse error in that case.
pub fn recover_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parses `.tables` output (`  => name` lines) into table names.
///
/// Lines that do not match are ignored; order is preserved.
pub fn parse_table_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| table_line_regex().captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Extracts the table name from a `CREATE TABLE` / `CREATE VIRTUAL TABLE` line.
pub fn table_name_from_create(line: &str) -> Option<&str> {
    create_table_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Collects the schema text of the requested tables from a `.schema` dump.
///
/// A boundary line starts a new table; following lines belong to it until
/// the next boundary. Blocks come back in dump order as `(name, text)`.
pub fn extract_schema_blocks(dump: &str, requested: &[String]) -> Vec<(String, String)> {
    let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let mut blocks = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in dump.lines() {
        if let Some(name) = table_name_from_create(line) {
            flush(&mut current, &mut blocks);
            if wanted.contains(name) {
                current = Some((name.to_string(), vec![line]));
            }
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    flush(&mut current, &mut blocks);

    blocks
}

fn flush(current: &mut Option<(String, Vec<&str>)>, blocks: &mut Vec<(String, String)>) {
    if let Some((name, lines)) = current.take() {
        let text = lines.join("\n").trim_end().to_string();
        if !text.is_empty() {
            blocks.push((name, text));
        }
    }
}
