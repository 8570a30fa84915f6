// tests/controller_shutdown.rs

use std::error::Error;

use tokio::time::Duration;

use rono::report::Report;
use rono_test_utils::{FakeExecutor, FakeOutcome, HarnessBuilder, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn concurrent_shutdowns_close_watcher_once() -> TestResult {
    init_tracing();
    let h = HarnessBuilder::new("main.ts").spawn();
    h.advance(ms(100)).await;

    let first = h.shutdown.clone();
    let second = h.shutdown.clone();
    with_timeout(async { tokio::join!(first.shutdown(), second.shutdown()) }).await;

    assert!(first.is_closed());
    assert_eq!(h.notifier.close_count(), 1);

    h.join().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_after_close_resolves_immediately() -> TestResult {
    init_tracing();
    let h = HarnessBuilder::new("main.ts").spawn();
    h.advance(ms(100)).await;
    let late = h.shutdown.clone();
    let notifier = h.notifier.clone();

    h.stop().await?;
    with_timeout(late.shutdown()).await;

    assert_eq!(notifier.close_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_in_flight_run_and_drops_its_error() -> TestResult {
    init_tracing();
    let executor = FakeExecutor::new()
        .with_delay(ms(1000))
        .then(FakeOutcome::Exit(1));
    let h = HarnessBuilder::new("main.ts").executor(executor).spawn();
    h.advance(ms(10)).await;
    assert_eq!(h.probe.completed(), 0);

    with_timeout(h.shutdown.shutdown()).await;

    assert_eq!(h.probe.completed(), 1);
    assert_eq!(h.notifier.close_count(), 1);
    assert_eq!(h.reports.failed(), 0);
    assert_eq!(h.reports.watching(), 0);

    h.join().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn changes_during_shutdown_are_ignored() -> TestResult {
    init_tracing();
    let executor = FakeExecutor::new().with_delay(ms(1000));
    let h = HarnessBuilder::new("main.ts").executor(executor).spawn();
    h.advance(ms(10)).await;

    h.token.cancel();
    h.advance(ms(1)).await;
    h.touch_entry();
    with_timeout(h.shutdown.closed()).await;

    assert_eq!(h.probe.runs(), 1);
    assert_eq!(
        h.reports.count(|r| matches!(r, Report::Changed { .. })),
        0
    );

    h.join().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_restart() -> TestResult {
    init_tracing();
    let h = HarnessBuilder::new("main.ts").spawn();
    h.advance(ms(100)).await;

    h.touch_entry();
    h.advance(ms(10)).await;
    h.shutdown.shutdown().await;
    h.advance(ms(500)).await;

    assert_eq!(h.probe.runs(), 1);
    assert_eq!(h.notifier.close_count(), 1);

    h.join().await?;
    Ok(())
}
