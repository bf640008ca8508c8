//! Configuration files and native library lookup.

use std::path::PathBuf;

use crate::common::*;
use tempfile::TempDir;
use test_optimization::config::{CONFIG_FILE_NAME, LIBRARY_FILE_NAME};
use test_optimization::RuntimeConfig;

#[test]
fn config_file_drives_init_options() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        r#"
use_mock_tracer = true
working_directory = "/src/project"

[global_tags]
team = "infra"
"#,
    )
    .unwrap();

    let config = RuntimeConfig::from_file(&path).unwrap();
    let (engine, runtime) = runtime();
    runtime.initialize(&config.init_options()).unwrap();

    let seen = engine.init_options().unwrap();
    assert!(seen.use_mock_tracer);
    assert_eq!(seen.working_directory.as_deref(), Some("/src/project"));
    assert_eq!(seen.global_tags.get("team").map(String::as_str), Some("infra"));
    assert!(seen.environment_variables.is_empty());
}

#[test]
fn search_path_override_wins_over_bundled_dir() {
    let search = TempDir::new().unwrap();
    let bundled = TempDir::new().unwrap();
    std::fs::write(search.path().join(LIBRARY_FILE_NAME), b"").unwrap();
    std::fs::write(bundled.path().join(LIBRARY_FILE_NAME), b"").unwrap();

    let mut config = RuntimeConfig::default();
    config.library.bundled_dir = Some(bundled.path().to_path_buf());
    assert_eq!(
        config.resolve_library(),
        bundled.path().join(LIBRARY_FILE_NAME)
    );

    let search_dir = search.path().to_string_lossy().into_owned();
    let config = config.with_overrides_from(|_| Some(search_dir.clone()));
    assert_eq!(config.resolve_library(), search.path().join(LIBRARY_FILE_NAME));
}

#[test]
fn broken_library_fails_to_load() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(LIBRARY_FILE_NAME), b"\x7fELF truncated").unwrap();
    let mut config = RuntimeConfig::default();
    config.library.search_path = Some(dir.path().to_path_buf());
    assert_eq!(
        config.resolve_library(),
        dir.path().join(LIBRARY_FILE_NAME)
    );
    assert!(matches!(
        Runtime::native(&config),
        Err(Error::LibraryLoad(_))
    ));
}

#[test]
fn malformed_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[library\nsearch_path = 3").unwrap();
    assert!(matches!(
        RuntimeConfig::from_file(&path),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        RuntimeConfig::from_file(&PathBuf::from("/nonexistent/dir/cfg.toml")),
        Err(Error::Config(_))
    ));
}
