//! osq-glance - safe, bounded SQL access to osquery.
//!
//! This library exposes the core modules for embedding and for integration
//! tests: the process executor, the osquery query service and the result
//! model it decodes into.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod osquery;
pub mod process;
pub mod safety;

pub use error::{OsqError, Result};
pub use osquery::QueryService;
