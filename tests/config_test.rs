// tests/config_test.rs
use std::io::Write;

use serial_test::serial;
use tagver::config::{load_config, Config};
use tagver::{Style, TagverError};
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.defaults.style, None);
    assert_eq!(config.defaults.metadata, None);
    assert!(!config.defaults.dirty);
    assert!(!config.defaults.strict);
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[defaults]
style = "pvp"
format = "v{base}"
bump = true
full_commit = true
tag_branch = "release"
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.defaults.style, Some(Style::Pvp));
    assert_eq!(config.defaults.format.as_deref(), Some("v{base}"));
    assert!(config.defaults.bump);
    assert!(config.defaults.full_commit);
    assert_eq!(config.defaults.tag_branch.as_deref(), Some("release"));
}

#[test]
fn test_missing_explicit_file_is_error() {
    let err = load_config(Some("/nonexistent/tagver.toml")).unwrap_err();
    assert!(matches!(err, TagverError::Config(_)));
}

#[test]
fn test_malformed_file_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[defaults\nstyle = ").unwrap();
    temp_file.flush().unwrap();

    let err = load_config(Some(temp_file.path().to_str().unwrap())).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
#[serial]
fn test_local_config_file_is_found() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("tagver.toml"),
        "[defaults]\nstyle = \"semver\"\nstrict = true\n",
    )
    .unwrap();

    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let config = load_config(None);
    std::env::set_current_dir(original).unwrap();

    let config = config.unwrap();
    assert_eq!(config.defaults.style, Some(Style::SemVer));
    assert!(config.defaults.strict);
}
