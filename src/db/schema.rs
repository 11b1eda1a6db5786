//! Table schema types for osq-glance.
//!
//! Represents osquery tables as parsed from their `CREATE TABLE` text. The
//! declared column type is kept verbatim and normalized on demand.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed vocabulary of column types shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
    Datetime,
    UnsignedInteger,
}

impl ColumnType {
    /// Maps a declared type (as osquery prints it) onto the vocabulary.
    ///
    /// Unknown types fall back to text, which is how osquery serializes
    /// every column in JSON output anyway.
    pub fn normalize(declared: &str) -> Self {
        let upper = declared.trim().to_uppercase().replace('_', " ");
        let words: Vec<&str> = upper.split_whitespace().collect();
        match words.as_slice() {
            ["UNSIGNED", ..] => Self::UnsignedInteger,
            ["INTEGER"] | ["INT"] | ["BIGINT"] | ["SMALLINT"] | ["TINYINT"] => Self::Integer,
            ["DOUBLE"] | ["REAL"] | ["FLOAT"] | ["NUMERIC"] => Self::Real,
            ["BLOB"] => Self::Blob,
            ["DATETIME"] | ["TIMESTAMP"] | ["DATE"] => Self::Datetime,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Blob => "blob",
            Self::Datetime => "datetime",
            Self::UnsignedInteger => "unsigned integer",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    /// Column name.
    pub name: String,

    /// Declared type exactly as osquery printed it.
    pub declared_type: String,

    /// Hidden columns are only returned when selected explicitly.
    #[serde(default)]
    pub hidden: bool,
}

impl SchemaColumn {
    /// Returns the normalized column type.
    pub fn column_type(&self) -> ColumnType {
        ColumnType::normalize(&self.declared_type)
    }
}

/// Represents an osquery table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<SchemaColumn>,
}

impl TableSchema {
    /// Parses one `CREATE TABLE name(...)` statement.
    ///
    /// Table constraints such as `PRIMARY KEY (...)` are skipped. Returns
    /// `None` if the text is not a table definition.
    pub fn parse(statement: &str) -> Option<Self> {
        let name = super::parser::table_name_from_create(statement)?;
        let open = statement.find('(')?;
        let close = statement.rfind(')')?;
        if close <= open {
            return None;
        }

        let columns = split_top_level(&statement[open + 1..close])
            .into_iter()
            .filter_map(parse_column)
            .collect();

        Some(Self {
            name: name.to_string(),
            columns,
        })
    }

    /// Returns the column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&SchemaColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Formats the table for display.
    pub fn format_for_display(&self) -> String {
        let column_lines = self
            .columns
            .iter()
            .map(|column| {
                if column.hidden {
                    format!("  - {}: {} (hidden)\n", column.name, column.column_type())
                } else {
                    format!("  - {}: {}\n", column.name, column.column_type())
                }
            })
            .collect::<Vec<_>>()
            .join("");

        format!("Table: {}\n{}", self.name, column_lines)
    }
}

/// Splits a column list on commas that are not nested in parentheses.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn parse_column(definition: &str) -> Option<SchemaColumn> {
    let definition = definition.trim();
    let upper = definition.to_uppercase();
    if definition.is_empty()
        || upper.starts_with("PRIMARY KEY")
        || upper.starts_with("UNIQUE")
        || upper.starts_with("CONSTRAINT")
    {
        return None;
    }

    let (name, rest) = match definition.chars().next()? {
        quote @ ('`' | '"' | '[') => {
            let closing = if quote == '[' { ']' } else { quote };
            let end = definition[1..].find(closing)? + 1;
            (&definition[1..end], &definition[end + 1..])
        }
        _ => match definition.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest),
            None => (definition, ""),
        },
    };

    let mut words: Vec<&str> = rest.split_whitespace().collect();
    let hidden = words
        .last()
        .is_some_and(|w| w.eq_ignore_ascii_case("HIDDEN"));
    if hidden {
        words.pop();
    }

    Some(SchemaColumn {
        name: name.to_string(),
        declared_type: words.join(" "),
        hidden,
    })
}
