//! Result and schema model for osquery output.
//!
//! Holds the decoded row types, table schemas and the parsers that turn raw
//! osquery shell output into them.

pub mod parser;
mod schema;
mod types;

pub use parser::{
    extract_schema_blocks, parse_json_rows, parse_table_list, recover_json_array,
    table_name_from_create,
};
pub use schema::{ColumnType, SchemaColumn, TableSchema};
pub use types::{QueryResult, ResultRow, Value};
