//! Query safety checks.
//!
//! SQL text ends up as a single argument of a spawned osquery shell, possibly
//! behind an architecture wrapper. Everything here runs before a process is
//! built; a rejected query never reaches the process layer.

mod validator;

pub use validator::{validate_sql, SqlValidator};

/// Maximum accepted length of a trimmed query, in characters.
pub const MAX_QUERY_LENGTH: usize = 10_000;

/// Statement keywords a query may start with. osquery is read-only.
pub const ALLOWED_PREFIXES: &[&str] = &["SELECT", "PRAGMA", "EXPLAIN"];

/// Substrings that are never passed to the shell.
///
/// Covers command substitution, chaining, piping, redirection, raw line
/// breaks and escape-sequence prefixes.
pub const DENIED_SEQUENCES: &[&str] = &[
    "$(", "`", "&&", "||", "|", "<", ">", "\n", "\r", "\\x", "\\u",
];
