//! Integration tests for osq-glance.

pub mod common;
pub mod executor_test;
pub mod launch_test;
pub mod schema_test;
