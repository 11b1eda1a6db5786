//! Schema introspection tests.

use std::sync::Arc;

use osq_glance::db::ColumnType;
use osq_glance::osquery::extension::extension_schema;
use osq_glance::process::MockProcessRunner;
use pretty_assertions::assert_eq;

use super::common::TestEnv;

const SCHEMA_DUMP: &str = "\
CREATE TABLE processes(`pid` BIGINT, `name` TEXT, `path` TEXT, `cmdline` TEXT HIDDEN, PRIMARY KEY (`pid`)) WITHOUT ROWID;
CREATE TABLE users(`uid` BIGINT, `gid` BIGINT, `username` TEXT, `directory` TEXT);
CREATE VIRTUAL TABLE time USING time(`weekday` TEXT, `year` INTEGER);
";

fn tables(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_schema_merges_native_and_extension_tables() {
    let env = TestEnv::with_extension();
    let runner = Arc::new(MockProcessRunner::with_stdout(SCHEMA_DUMP));
    let service = env.service(runner.clone());

    let text = service
        .get_schema(&tables(&["processes", "mdm"]))
        .await
        .unwrap();

    let expected = format!(
        "CREATE TABLE processes(`pid` BIGINT, `name` TEXT, `path` TEXT, `cmdline` TEXT HIDDEN, PRIMARY KEY (`pid`)) WITHOUT ROWID;\n{}",
        extension_schema("mdm").unwrap()
    );
    assert_eq!(text, expected);
    assert!(!text.contains("CREATE TABLE users"));

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(
        invocations[0].args().last().map(String::as_str),
        Some(".schema")
    );
}

#[tokio::test]
async fn test_empty_request_spawns_nothing() {
    let env = TestEnv::standalone();
    let runner = Arc::new(MockProcessRunner::with_stdout(SCHEMA_DUMP));
    let service = env.service(runner.clone());

    assert_eq!(service.get_schema(&[]).await.unwrap(), "");
    assert_eq!(runner.invocation_count(), 0);
}

#[tokio::test]
async fn test_extension_only_request_skips_schema_dump() {
    let env = TestEnv::with_extension();
    let runner = Arc::new(MockProcessRunner::with_stdout(SCHEMA_DUMP));
    let service = env.service(runner.clone());

    let text = service
        .get_schema(&tables(&["mdm", "munki_info", "mdm"]))
        .await
        .unwrap();

    assert_eq!(
        text,
        format!(
            "{}\n{}",
            extension_schema("mdm").unwrap(),
            extension_schema("munki_info").unwrap()
        )
    );
    assert_eq!(runner.invocation_count(), 0);
}

#[tokio::test]
async fn test_unknown_tables_are_skipped() {
    let env = TestEnv::standalone();
    let runner = Arc::new(MockProcessRunner::with_stdout(SCHEMA_DUMP));
    let service = env.service(runner);

    let text = service
        .get_schema(&tables(&["no_such_table", "time"]))
        .await
        .unwrap();
    assert_eq!(
        text,
        "CREATE VIRTUAL TABLE time USING time(`weekday` TEXT, `year` INTEGER);"
    );
}

#[tokio::test]
async fn test_table_schemas_are_structured() {
    let env = TestEnv::with_extension();
    let runner = Arc::new(MockProcessRunner::with_stdout(SCHEMA_DUMP));
    let service = env.service(runner);

    let schemas = service
        .table_schemas(&tables(&["processes", "mdm"]))
        .await
        .unwrap();

    assert_eq!(schemas.len(), 2);
    let processes = &schemas[0];
    assert_eq!(processes.name, "processes");
    assert_eq!(
        processes.column_names().collect::<Vec<_>>(),
        vec!["pid", "name", "path", "cmdline"]
    );
    assert_eq!(processes.columns[0].column_type(), ColumnType::Integer);
    assert!(processes.columns[3].hidden);

    let mdm = &schemas[1];
    assert_eq!(mdm.name, "mdm");
    assert_eq!(
        mdm.column("install_date").map(|c| c.column_type()),
        Some(ColumnType::Datetime)
    );
}

#[tokio::test]
async fn test_execute_with_schema_orders_columns() {
    let env = TestEnv::standalone();
    let runner = Arc::new(MockProcessRunner::with_stdout(
        r#"[{"name":"launchd","extra":"x","pid":"1"}]"#,
    ));
    let service = env.service(runner);
    let schema = osq_glance::db::TableSchema::parse(
        "CREATE TABLE processes(`pid` BIGINT, `name` TEXT, `path` TEXT)",
    )
    .unwrap();

    let result = service
        .execute_with_schema("SELECT * FROM processes", &schema)
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["pid", "name", "extra"]);
}
