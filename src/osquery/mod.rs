//! osquery integration for osq-glance.
//!
//! Everything that knows how osquery is launched lives here: binary and
//! extension discovery, argument policy, per-call sockets and the
//! [`QueryService`] that ties them to a process runner.

pub mod args;
pub mod extension;
pub mod paths;
pub mod sockets;
mod service;

pub use args::{ArchForcing, LaunchEnvironment, LaunchMode, OutputMode};
pub use extension::{extension_schema, extension_table_names, is_extension_table};
pub use service::QueryService;
