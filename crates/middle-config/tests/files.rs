//! Loading configuration from files on disk.

use std::io::Write;

use middle_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::NamedTempFile;

fn file_with(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_file() {
    let file = file_with(
        ".toml",
        r#"
            [router]
            base_url = "https://example.com/app/"

            [logging]
            format = "json"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.router.base_url, "https://example.com/app/");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_json_file() {
    let file = file_with(".json", r#"{"json": {"content_types": ["^text/json$"]}}"#);

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.json.content_types, ["^text/json$"]);
}

#[test]
fn test_later_file_overrides_earlier_file() {
    let base = file_with(".toml", "[logging]\nlevel = \"warn\"\nformat = \"compact\"");
    let local = file_with(".toml", "[logging]\nlevel = \"debug\"");

    let config = ConfigLoader::new()
        .with_file(base.path())
        .unwrap()
        .with_optional_file(local.path())
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
fn test_unknown_extension() {
    let file = file_with(".yaml", "router: {}");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
}

#[test]
fn test_malformed_file() {
    let file = file_with(".toml", "[router\nbase_url = ");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}

#[test]
fn test_invalid_value_in_file_fails_on_load() {
    let file = file_with(".toml", "[json]\ncontent_types = [\"(\"]");
    let result = ConfigLoader::new().with_file(file.path()).unwrap().load();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
