// tests/config_loading.rs

use std::error::Error;
use std::fs;

use rono::config::{load_and_validate, resolve_config};
use rono::errors::RonoError;
use rono_test_utils::ConfigFileBuilder;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn defaults_apply_when_sections_are_missing() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Rono.toml");
    fs::write(&path, "")?;

    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.run.runtime, "node");
    assert!(cfg.run.runtime_args.is_empty());
    assert!(cfg.run.extensions.iter().any(|e| e == "ts"));
    assert_eq!(cfg.watch.debounce_ms, 50);
    assert!(cfg.watch.exclude.is_empty());
    assert!(!cfg.watch.use_hash);
    assert!(!cfg.watch.fatal_initial_failure);
    Ok(())
}

#[test]
fn full_file_is_loaded() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Rono.toml");
    fs::write(
        &path,
        r#"
[run]
runtime = "deno"
runtime_args = ["run", "-A"]
extensions = ["ts", "js"]

[watch]
debounce_ms = 120
exclude = ["**/node_modules/**"]
use_hash = true
fatal_initial_failure = true
"#,
    )?;

    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.run.runtime, "deno");
    assert_eq!(cfg.run.runtime_args, vec!["run", "-A"]);
    assert_eq!(cfg.run.extensions, vec!["ts", "js"]);
    assert_eq!(cfg.watch.debounce_ms, 120);
    assert_eq!(cfg.watch.exclude, vec!["**/node_modules/**"]);
    assert!(cfg.watch.use_hash);
    assert!(cfg.watch.fatal_initial_failure);
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Rono.toml");
    fs::write(&path, "[watch]\ndebounce = 10\n")?;

    let err = load_and_validate(&path).unwrap_err();

    assert!(matches!(err, RonoError::TomlError(_)), "{err:?}");
    Ok(())
}

#[test]
fn explicit_missing_config_is_an_error() -> TestResult {
    let dir = tempdir()?;
    let missing = dir.path().join("nope.toml");

    assert!(resolve_config(Some(missing.as_path())).is_err());
    Ok(())
}

#[test]
fn debounce_must_be_in_range() {
    for ms in [0, 60_001] {
        let err = ConfigFileBuilder::new().debounce_ms(ms).try_build().unwrap_err();
        assert!(matches!(err, RonoError::ConfigError(_)), "{ms}: {err:?}");
    }
    assert!(ConfigFileBuilder::new().debounce_ms(60_000).try_build().is_ok());
}

#[test]
fn runtime_must_not_be_blank() {
    let err = ConfigFileBuilder::new().runtime("  ").try_build().unwrap_err();
    assert!(err.to_string().contains("runtime"), "{err}");
}

#[test]
fn extensions_are_written_without_dots() {
    assert!(ConfigFileBuilder::new().extensions(&[".ts"]).try_build().is_err());
    assert!(ConfigFileBuilder::new().extensions(&[]).try_build().is_err());
    assert!(ConfigFileBuilder::new().extensions(&["ts"]).try_build().is_ok());
}

#[test]
fn exclude_globs_must_compile() {
    let err = ConfigFileBuilder::new().exclude("src/[").try_build().unwrap_err();
    assert!(matches!(err, RonoError::GlobError(_)), "{err:?}");
}
