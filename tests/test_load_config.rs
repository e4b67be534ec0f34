use relnotes_admin::config::{Settings, DEFAULT_API_URL};
use relnotes_admin::load_config::load_config;
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var("CMS_API_URL");
    env::remove_var("CMS_USE_FIXTURES");
    env::remove_var("CMS_TIMEOUT_SECS");
}

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// Without a file or env overrides the built-in defaults apply.
#[test]
#[serial]
fn test_load_config_defaults_without_file() {
    clear_env();
    let settings = load_config(None).expect("defaults should load");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.api_url, DEFAULT_API_URL);
}

#[test]
#[serial]
fn test_load_config_reads_yaml_and_trims_trailing_slash() {
    clear_env();
    let file = config_file(
        r#"
api_url: "https://cms.example.com/api/"
use_fixture_data: true
timeout_secs: 5
"#,
    );

    let settings = load_config(Some(file.path())).expect("config should load");
    assert_eq!(settings.api_url, "https://cms.example.com/api");
    assert!(settings.use_fixture_data);
    assert_eq!(settings.timeout_secs, 5);
}

#[test]
#[serial]
fn test_load_config_empty_file_means_defaults() {
    clear_env();
    let file = config_file("\n");
    let settings = load_config(Some(file.path())).unwrap();
    assert_eq!(settings, Settings::default());
}

/// Environment variables win over the file.
#[test]
#[serial]
fn test_load_config_env_overrides_file() {
    clear_env();
    let file = config_file("api_url: http://from-file/api\nuse_fixture_data: false\n");
    env::set_var("CMS_API_URL", "http://from-env:9000/api");
    env::set_var("CMS_USE_FIXTURES", "yes");
    env::set_var("CMS_TIMEOUT_SECS", "12");

    let settings = load_config(Some(file.path())).unwrap();
    clear_env();

    assert_eq!(settings.api_url, "http://from-env:9000/api");
    assert!(settings.use_fixture_data);
    assert_eq!(settings.timeout_secs, 12);
}

#[test]
#[serial]
fn test_load_config_rejects_bad_fixture_flag() {
    clear_env();
    env::set_var("CMS_USE_FIXTURES", "sometimes");
    let err = load_config(None).unwrap_err();
    clear_env();
    assert!(
        err.to_string().contains("CMS_USE_FIXTURES"),
        "unexpected error: {err}"
    );
}

#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    clear_env();
    let file = config_file("not-yaml: [:::");
    let msg = load_config(Some(file.path())).unwrap_err().to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_load_config_rejects_unknown_keys() {
    clear_env();
    let file = config_file("api_url: http://x/api\nbucket_id: 3\n");
    assert!(load_config(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    clear_env();
    let err = load_config(Some(std::path::Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

/// A zero timeout would make every request fail instantly.
#[test]
#[serial]
fn test_load_config_rejects_zero_timeout() {
    clear_env();
    let file = config_file("timeout_secs: 0\n");
    let msg = load_config(Some(file.path())).unwrap_err().to_string();
    assert!(msg.contains("timeout_secs"), "unexpected error: {msg}");

    env::set_var("CMS_TIMEOUT_SECS", "0");
    let msg = load_config(None).unwrap_err().to_string();
    clear_env();
    assert!(msg.contains("CMS_TIMEOUT_SECS"), "unexpected error: {msg}");
}
