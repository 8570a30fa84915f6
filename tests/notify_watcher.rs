// tests/notify_watcher.rs

use std::error::Error;
use std::fs;
use std::time::Duration;

use rono::types::ChangeKind;
use rono::watch::{ChangeNotifier, NotifyWatcher, WatcherEvent, WatcherOptions};
use rono_test_utils::{init_tracing, with_timeout};
use tempfile::tempdir;
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

/// Next change event, skipping anything else the platform reports.
async fn next_change(
    rx: &mut mpsc::UnboundedReceiver<WatcherEvent>,
) -> Option<(ChangeKind, std::path::PathBuf)> {
    while let Some(event) = rx.recv().await {
        if let WatcherEvent::Changed { kind, path } = event {
            return Some((kind, path));
        }
    }
    None
}

#[tokio::test]
async fn reports_changes_to_watched_files_only() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    let watched = root.join("main.ts");
    let other = root.join("other.ts");
    fs::write(&watched, "one")?;
    fs::write(&other, "one")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = NotifyWatcher::new(tx, WatcherOptions::default())?;
    watcher.watch(&[watched.clone()])?;
    assert_eq!(watcher.watched_files(), vec![watched.clone()]);

    // Give the backend a moment to register the directory.
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(&other, "two")?;
    fs::write(&watched, "two")?;

    let (_, path) = with_timeout(next_change(&mut rx))
        .await
        .ok_or("watcher channel closed")?;
    assert_eq!(path, watched);

    watcher.close().await?;
    assert!(watcher.watched_files().is_empty());
    Ok(())
}

#[tokio::test]
async fn unwatch_stops_reporting() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    let a = root.join("a.ts");
    let b = root.join("b.ts");
    fs::write(&a, "a")?;
    fs::write(&b, "b")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = NotifyWatcher::new(tx, WatcherOptions::default())?;
    watcher.watch(&[a.clone(), b.clone()])?;
    watcher.unwatch(&[a.clone()])?;
    assert_eq!(watcher.watched_files(), vec![b.clone()]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(&a, "a2")?;
    fs::write(&b, "b2")?;

    let (_, path) = with_timeout(next_change(&mut rx))
        .await
        .ok_or("watcher channel closed")?;
    assert_eq!(path, b);

    watcher.close().await?;
    Ok(())
}
