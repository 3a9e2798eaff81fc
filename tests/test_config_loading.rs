//! Configuration loading and validation tests
//!
//! Tests focus on behavior of configuration loading from disk and on how the
//! loaded values reach the supervisor.

use rfid_supervisor::config::{ConfigError, SupervisorConfig};
use rfid_supervisor::reader::{KeepalivePolicy, ReconnectPolicy};
use rfid_supervisor::testing::mocks::{MockAdminChannel, MockDeviceLink, MockProbe};
use rfid_supervisor::ReaderSupervisor;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
[reader]
name = "dock-door-1"
address = "192.168.1.50"

[parameters]
tx_power_centi_dbm = 3150
session = 1
search_mode = "tag_focus"

[connection]
reboot_after_reconnects = 4
"#,
    );

    let config = SupervisorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.reader.name, "dock-door-1");
    assert_eq!(config.reader.address, "192.168.1.50");
    assert_eq!(config.parameters.session, 1);
    assert!((config.parameters.tx_power_dbm() - 31.5).abs() < 1e-9);
    assert_eq!(config.connection.reboot_after_reconnects, 4);
    // Unspecified values keep their defaults
    assert_eq!(config.connection.keepalive_secs, 5);
    assert_eq!(config.connection.max_keepalive_lost, 3);
}

#[test]
fn test_missing_file_is_file_read_error() {
    let result = SupervisorConfig::load_from_file(Path::new("/nonexistent/reader.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let temp_file = write_config("[reader\nname = ");
    let result = SupervisorConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_unknown_search_mode_is_parse_error() {
    let temp_file = write_config(
        r#"
[reader]
name = "r"
address = "10.0.0.1"

[parameters]
tx_power_centi_dbm = 3000
session = 2
search_mode = "sideways"
"#,
    );
    let result = SupervisorConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_invalid_values_fail_validation() {
    let cases = [
        ("", "10.0.0.1", 2, 10),
        ("r", "", 2, 10),
        ("r", "10.0.0.1", 7, 10),
        ("r", "10.0.0.1", 2, 0),
    ];

    for (name, address, session, connect_timeout) in cases {
        let temp_file = write_config(&format!(
            r#"
[reader]
name = "{name}"
address = "{address}"

[parameters]
tx_power_centi_dbm = 3000
session = {session}

[connection]
connect_timeout_secs = {connect_timeout}
"#
        ));
        let result = SupervisorConfig::load_from_file(temp_file.path());
        assert!(
            matches!(result, Err(ConfigError::InvalidConfig(_))),
            "expected rejection for name={name:?} address={address:?} session={session} timeout={connect_timeout}"
        );
    }
}

#[test]
fn test_policies_derive_from_config() {
    let config = SupervisorConfig::from_toml_str(
        r#"
[reader]
name = "r"
address = "10.0.0.1"

[parameters]
tx_power_centi_dbm = 3000
session = 2

[connection]
keepalive_secs = 7
max_keepalive_lost = 2
grace_window_secs = 12
reboot_after_reconnects = 0
"#,
    )
    .unwrap();

    let policy = ReconnectPolicy::from_config(&config);
    assert_eq!(policy.grace_window, Duration::from_secs(12));
    assert_eq!(policy.reboot_threshold, 0);

    let keepalive = KeepalivePolicy::from_config(&config.connection);
    assert_eq!(keepalive.period_secs, 7);
    assert_eq!(keepalive.max_lost, 2);
}

#[test]
fn test_admin_password_read_from_environment() {
    std::env::set_var("RFID_SUPERVISOR_TEST_ADMIN_PASSWORD", "s3cret");
    let config = SupervisorConfig::from_toml_str(
        r#"
[reader]
name = "r"
address = "10.0.0.1"

[parameters]
tx_power_centi_dbm = 3000
session = 2

[admin]
password_env = "RFID_SUPERVISOR_TEST_ADMIN_PASSWORD"
"#,
    )
    .unwrap();

    assert_eq!(config.admin.credentials().password, "s3cret");
}

#[tokio::test]
async fn test_supervisor_from_config_uses_connect_timeout_and_keepalive() {
    let config = SupervisorConfig::from_toml_str(
        r#"
[reader]
name = "r"
address = "10.0.0.1"

[parameters]
tx_power_centi_dbm = 3000
session = 2

[connection]
connect_timeout_secs = 3
keepalive_secs = 4
max_keepalive_lost = 6
"#,
    )
    .unwrap();
    let link = Arc::new(MockDeviceLink::new("10.0.0.1"));
    let supervisor = ReaderSupervisor::from_config(
        &config,
        link.clone(),
        Arc::new(MockProbe::reachable()),
        Box::new(MockAdminChannel::new()),
    );

    supervisor.start_reader().await;

    assert_eq!(link.last_connect_timeout(), Some(Duration::from_secs(3)));
    let settings = link.last_applied_settings().unwrap();
    assert_eq!(settings.keepalive.period_ms, 4000);
    assert_eq!(settings.keepalive.link_down_threshold, 6);
    assert_eq!(settings.session, 2);
}
