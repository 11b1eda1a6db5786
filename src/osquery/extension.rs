//! Tables registered by the bundled extension.
//!
//! osquery's `.tables` and `.schema` commands only describe built-in tables,
//! so the extension's tables and their schemas are listed here.

/// Extension table names with their `CREATE TABLE` text.
pub const EXTENSION_TABLES: &[(&str, &str)] = &[
    (
        "alt_system_info",
        "CREATE TABLE alt_system_info(`computer_name` TEXT, `hostname` TEXT, \
         `local_hostname` TEXT, `hardware_model` TEXT, `hardware_serial` TEXT, \
         `cpu_brand` TEXT, `physical_memory` BIGINT);",
    ),
    (
        "authdb",
        "CREATE TABLE authdb(`right_name` TEXT, `json_result` TEXT);",
    ),
    (
        "file_lines",
        "CREATE TABLE file_lines(`path` TEXT, `line` TEXT);",
    ),
    (
        "filevault_users",
        "CREATE TABLE filevault_users(`username` TEXT, `uuid` TEXT);",
    ),
    (
        "google_chrome_profiles",
        "CREATE TABLE google_chrome_profiles(`username` TEXT, `email` TEXT, \
         `name` TEXT, `ephemeral` INTEGER);",
    ),
    (
        "macos_profiles",
        "CREATE TABLE macos_profiles(`identifier` TEXT, `display_name` TEXT, \
         `install_date` DATETIME, `organization` TEXT, `uuid` TEXT, \
         `verification_state` TEXT, `user` TEXT);",
    ),
    (
        "mdm",
        "CREATE TABLE mdm(`enrolled` TEXT, `server_url` TEXT, `checkin_url` TEXT, \
         `access_rights` TEXT, `install_date` DATETIME, `payload_identifier` TEXT, \
         `topic` TEXT, `sign_message` TEXT, `identity_certificate_uuid` TEXT, \
         `installed_from_dep` TEXT, `user_approved` TEXT, `dep_capable` TEXT, \
         `has_scep_payload` TEXT);",
    ),
    (
        "munki_info",
        "CREATE TABLE munki_info(`version` TEXT, `start_time` TEXT, `end_time` TEXT, \
         `success` TEXT, `errors` TEXT, `warnings` TEXT, `problem_installs` TEXT, \
         `manifest_name` TEXT, `console_user` TEXT);",
    ),
    (
        "munki_installs",
        "CREATE TABLE munki_installs(`name` TEXT, `installed` TEXT, \
         `installed_version` TEXT, `end_time` TEXT);",
    ),
    (
        "network_quality",
        "CREATE TABLE network_quality(`dl_throughput_kbps` DOUBLE, \
         `ul_throughput_kbps` DOUBLE, `dl_throughput_mbps` DOUBLE, \
         `ul_throughput_mbps` DOUBLE, `dl_responsiveness` UNSIGNED BIGINT);",
    ),
    (
        "pending_apple_updates",
        "CREATE TABLE pending_apple_updates(`product_key` TEXT, `display_name` TEXT, \
         `display_version` TEXT);",
    ),
    (
        "unified_log",
        "CREATE TABLE unified_log(`timestamp` DATETIME, `storage` INTEGER, \
         `message` TEXT, `activity` INTEGER, `process` TEXT, `pid` INTEGER, \
         `sender` TEXT, `tid` INTEGER, `category` TEXT, `subsystem` TEXT, \
         `level` TEXT, `max_rows` INTEGER HIDDEN, `predicate` TEXT HIDDEN, \
         `last` TEXT HIDDEN);",
    ),
];

/// Returns every extension table name.
pub fn extension_table_names() -> impl Iterator<Item = &'static str> {
    EXTENSION_TABLES.iter().map(|(name, _)| *name)
}

/// Returns the static schema of an extension table.
pub fn extension_schema(table: &str) -> Option<&'static str> {
    EXTENSION_TABLES
        .iter()
        .find(|(name, _)| *name == table)
        .map(|(_, schema)| *schema)
}

pub fn is_extension_table(table: &str) -> bool {
    extension_schema(table).is_some()
}
