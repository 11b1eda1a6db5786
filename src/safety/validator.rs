//! SQL validation logic.

use crate::error::{OsqError, Result};

use super::{ALLOWED_PREFIXES, DENIED_SEQUENCES, MAX_QUERY_LENGTH};

/// Validates SQL before it is handed to osquery.
#[derive(Debug, Clone)]
pub struct SqlValidator {
    max_length: usize,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlValidator {
    /// Creates a validator with the default length limit.
    pub fn new() -> Self {
        Self {
            max_length: MAX_QUERY_LENGTH,
        }
    }

    /// Returns the trimmed query if it passes every rule.
    ///
    /// Rules are checked in order: empty, too long, statement prefix, denied
    /// sequences. The deny-list runs against the raw text so a trailing
    /// newline is rejected even though trimming would hide it.
    pub fn validate<'a>(&self, sql: &'a str) -> Result<&'a str> {
        let trimmed = sql.trim();

        if trimmed.is_empty() {
            return Err(OsqError::invalid_query("Query cannot be empty"));
        }

        let length = trimmed.chars().count();
        if length > self.max_length {
            return Err(OsqError::invalid_query(format!(
                "Query is too long ({length} characters, maximum is {})",
                self.max_length
            )));
        }

        let upper = trimmed.to_uppercase();
        if !ALLOWED_PREFIXES.iter().any(|p| upper.starts_with(p)) {
            return Err(OsqError::invalid_query(format!(
                "Only {} statements are allowed",
                ALLOWED_PREFIXES.join(", ")
            )));
        }

        if let Some(seq) = DENIED_SEQUENCES.iter().find(|seq| sql.contains(*seq)) {
            return Err(OsqError::invalid_query(format!(
                "Query contains a disallowed sequence: {}",
                seq.escape_debug()
            )));
        }

        Ok(trimmed)
    }
}

/// Convenience function to validate SQL without creating a validator instance.
pub fn validate_sql(sql: &str) -> Result<&str> {
    SqlValidator::new().validate(sql)
}
