// tests/process_executor.rs
#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::sync::Arc;

use rono::cli::try_parse_from;
use rono::exec::{DependencyScanner, ProcessExecutor, RunError, RunExecutor, RunRequest};
use rono::fs::RealFileSystem;
use rono_test_utils::{init_tracing, with_timeout};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

fn sh() -> ProcessExecutor {
    let scanner = DependencyScanner::with_defaults(Arc::new(RealFileSystem)).unwrap();
    ProcessExecutor::new("sh", Vec::new(), scanner)
}

#[tokio::test]
async fn successful_run_reports_entry_as_dependency() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    let entry = root.join("main.sh");
    let out = root.join("out.txt");
    fs::write(&entry, "printf '%s,%s' \"$1\" \"$2\" > \"$3\"\n")?;

    let request = RunRequest::new(
        &entry,
        vec!["one".into(), "two".into(), out.display().to_string()],
    );
    let output = with_timeout(sh().execute(request)).await?;

    assert_eq!(output.dependency_files, vec![entry.clone()]);
    assert_eq!(fs::read_to_string(&out)?, "one,two");
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_a_run_error() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let entry = dir.path().join("fail.sh");
    fs::write(&entry, "exit 3\n")?;

    let err = with_timeout(sh().execute(RunRequest::new(&entry, Vec::new())))
        .await
        .unwrap_err();

    assert!(
        matches!(err, RunError::Exited { code: Some(3), .. }),
        "{err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn broken_import_fails_before_spawning() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let entry = dir.path().join("main.js");
    let marker = dir.path().join("ran");
    fs::write(
        &entry,
        format!("require('./missing');\ntouch {}\n", marker.display()),
    )?;

    let err = with_timeout(sh().execute(RunRequest::new(&entry, Vec::new())))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::UnresolvedImport { .. }), "{err:?}");
    assert!(!marker.exists());
    Ok(())
}

#[tokio::test]
async fn unknown_runtime_is_a_spawn_error() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let entry = dir.path().join("main.sh");
    fs::write(&entry, "true\n")?;
    let scanner = DependencyScanner::with_defaults(Arc::new(RealFileSystem))?;
    let executor = ProcessExecutor::new("rono-no-such-runtime", Vec::new(), scanner);

    let err = with_timeout(executor.execute(RunRequest::new(&entry, Vec::new())))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Spawn { .. }), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn single_run_exit_codes() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let ok = dir.path().join("ok.sh");
    let bad = dir.path().join("bad.sh");
    fs::write(&ok, "true\n")?;
    fs::write(&bad, "exit 1\n")?;
    let config = dir.path().join("Rono.toml");
    fs::write(&config, "[run]\nruntime = \"sh\"\n")?;
    let config = config.display().to_string();

    let args = try_parse_from(["rono", "--config", config.as_str(), ok.to_str().unwrap()])?;
    assert_eq!(with_timeout(rono::run(args)).await?, 0);

    let args = try_parse_from(["rono", "--config", config.as_str(), bad.to_str().unwrap()])?;
    assert_eq!(with_timeout(rono::run(args)).await?, 1);

    let missing = dir.path().join("missing.sh");
    let args = try_parse_from(["rono", "--config", config.as_str(), missing.to_str().unwrap()])?;
    assert_eq!(with_timeout(rono::run(args)).await?, 1);
    Ok(())
}

#[tokio::test]
async fn missing_entry_argument_exits_with_usage() -> TestResult {
    let args = try_parse_from(["rono"])?;
    assert_eq!(rono::run(args).await?, 1);
    Ok(())
}
