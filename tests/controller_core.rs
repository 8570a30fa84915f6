// tests/controller_core.rs

use std::path::PathBuf;
use std::time::Duration;

use rono::engine::{
    ControllerCommand, ControllerCore, ControllerEvent, ControllerOptions, Phase, RunOutcome,
};
use rono::report::Report;
use rono::types::ChangeKind;
use rono_test_utils::init_tracing;

const DEBOUNCE: Duration = Duration::from_millis(50);
const ELAPSED: Duration = Duration::from_millis(7);

fn core() -> ControllerCore {
    ControllerCore::new(ControllerOptions::new("main.ts", "/project"))
}

fn p(s: &str) -> PathBuf {
    PathBuf::from(s)
}

fn entry() -> PathBuf {
    p("/project/main.ts")
}

fn change(core: &mut ControllerCore, path: &str) -> Vec<ControllerCommand> {
    core.step(ControllerEvent::FileChanged {
        kind: ChangeKind::Change,
        path: p(path),
    })
    .commands
}

fn settle_ok(core: &mut ControllerCore, run_id: u64, deps: &[&str]) -> Vec<ControllerCommand> {
    core.step(ControllerEvent::RunSettled {
        run_id,
        outcome: RunOutcome::Succeeded {
            dependency_files: deps.iter().map(|d| p(d)).collect(),
        },
        elapsed: ELAPSED,
    })
    .commands
}

fn settle_err(core: &mut ControllerCore, run_id: u64) -> Vec<ControllerCommand> {
    core.step(ControllerEvent::RunSettled {
        run_id,
        outcome: RunOutcome::Failed {
            error: "boom".to_string(),
        },
        elapsed: ELAPSED,
    })
    .commands
}

/// Core that has finished its initial run with no extra dependencies.
fn idle_core() -> ControllerCore {
    let mut core = core();
    core.step(ControllerEvent::Started);
    settle_ok(&mut core, 1, &[]);
    core
}

fn sorted(mut v: Vec<PathBuf>) -> Vec<PathBuf> {
    v.sort();
    v
}

#[test]
fn start_watches_entry_and_runs_once() {
    init_tracing();
    let mut core = core();

    let step = core.step(ControllerEvent::Started);

    assert!(step.keep_running);
    assert_eq!(
        step.commands,
        vec![
            ControllerCommand::Watch(vec![entry()]),
            ControllerCommand::StartRun { run_id: 1 },
        ]
    );
    assert_eq!(core.phase(), Phase::Running);
    assert_eq!(core.in_flight(), Some(1));
}

#[test]
fn duplicate_start_is_ignored() {
    let mut core = core();
    core.step(ControllerEvent::Started);

    let step = core.step(ControllerEvent::Started);

    assert!(step.commands.is_empty());
    assert_eq!(core.runs_started(), 1);
}

#[test]
fn successful_initial_run_reports_completion_then_watching() {
    let mut core = core();
    core.step(ControllerEvent::Started);

    let commands = settle_ok(&mut core, 1, &[]);

    assert_eq!(
        commands,
        vec![
            ControllerCommand::Report(Report::RunCompleted {
                entry: entry(),
                elapsed: ELAPSED,
            }),
            ControllerCommand::Report(Report::Watching),
        ]
    );
    assert_eq!(core.phase(), Phase::Idle);
}

#[test]
fn change_while_idle_arms_debounce() {
    let mut core = idle_core();

    let commands = change(&mut core, "/project/main.ts");

    assert_eq!(
        commands,
        vec![
            ControllerCommand::Report(Report::Changed {
                kind: ChangeKind::Change,
                path: entry(),
            }),
            ControllerCommand::ArmDebounce {
                generation: 1,
                delay: DEBOUNCE,
            },
        ]
    );
    assert_eq!(core.phase(), Phase::Debouncing);
}

#[test]
fn burst_of_changes_collapses_into_latest_timer() {
    let mut core = idle_core();

    change(&mut core, "/project/main.ts");
    change(&mut core, "/project/main.ts");
    let last = change(&mut core, "/project/main.ts");
    assert!(last.contains(&ControllerCommand::ArmDebounce {
        generation: 3,
        delay: DEBOUNCE,
    }));

    // Older timers were replaced; their expiry does nothing.
    for stale in [1, 2] {
        let step = core.step(ControllerEvent::DebounceElapsed { generation: stale });
        assert!(step.commands.is_empty(), "generation {stale} should be stale");
    }
    assert_eq!(core.runs_started(), 1);

    let step = core.step(ControllerEvent::DebounceElapsed { generation: 3 });
    assert_eq!(step.commands, vec![ControllerCommand::StartRun { run_id: 2 }]);
    assert_eq!(core.phase(), Phase::Running);
}

#[test]
fn changes_during_run_owe_exactly_one_restart() {
    let mut core = core();
    core.step(ControllerEvent::Started);

    for _ in 0..10 {
        let commands = change(&mut core, "/project/main.ts");
        // Only the report; no timer and certainly no second run.
        assert_eq!(commands.len(), 1);
        assert!(matches!(
            commands[0],
            ControllerCommand::Report(Report::Changed { .. })
        ));
    }
    assert_eq!(core.phase(), Phase::RunningRestartOwed);
    assert_eq!(core.runs_started(), 1);

    let commands = settle_ok(&mut core, 1, &[]);
    assert!(commands.contains(&ControllerCommand::ArmDebounce {
        generation: 1,
        delay: DEBOUNCE,
    }));
    // Startup is still announced once, ahead of the owed restart.
    assert_eq!(commands[1], ControllerCommand::Report(Report::Watching));
    assert_eq!(core.phase(), Phase::Debouncing);

    let step = core.step(ControllerEvent::DebounceElapsed { generation: 1 });
    assert_eq!(step.commands, vec![ControllerCommand::StartRun { run_id: 2 }]);

    let commands = settle_ok(&mut core, 2, &[]);
    assert!(commands.contains(&ControllerCommand::Report(Report::Watching)));
    assert_eq!(core.runs_started(), 2);
    assert_eq!(core.phase(), Phase::Idle);
}

#[test]
fn settlement_for_unknown_run_is_ignored() {
    let mut core = core();
    core.step(ControllerEvent::Started);

    let commands = settle_ok(&mut core, 7, &["/project/a.ts"]);

    assert!(commands.is_empty());
    assert_eq!(core.in_flight(), Some(1));
    assert_eq!(core.watch_set().len(), 1);
}

#[test]
fn successful_runs_reconcile_subscriptions() {
    let mut core = core();
    core.step(ControllerEvent::Started);

    let commands = settle_ok(&mut core, 1, &["/project/a.ts", "b.ts", "/project/main.ts"]);
    let ControllerCommand::Watch(added) = &commands[0] else {
        panic!("expected a watch command first, got {commands:?}");
    };
    assert_eq!(
        sorted(added.clone()),
        vec![p("/project/a.ts"), p("/project/b.ts")]
    );

    change(&mut core, "/project/a.ts");
    core.step(ControllerEvent::DebounceElapsed { generation: 1 });
    let commands = settle_ok(&mut core, 2, &["/project/a.ts", "/project/c.ts"]);

    assert_eq!(commands[0], ControllerCommand::Watch(vec![p("/project/c.ts")]));
    assert_eq!(commands[1], ControllerCommand::Unwatch(vec![p("/project/b.ts")]));
    assert_eq!(
        core.watch_set().to_sorted_vec(),
        vec![p("/project/a.ts"), p("/project/c.ts"), entry()]
    );
}

#[test]
fn failed_run_leaves_watch_set_alone() {
    let mut core = core();
    core.step(ControllerEvent::Started);
    settle_ok(&mut core, 1, &["/project/a.ts"]);
    change(&mut core, "/project/a.ts");
    core.step(ControllerEvent::DebounceElapsed { generation: 1 });

    let commands = settle_err(&mut core, 2);

    assert_eq!(
        commands,
        vec![
            ControllerCommand::Report(Report::RunFailed {
                error: "boom".to_string(),
            }),
            ControllerCommand::Report(Report::Watching),
        ]
    );
    assert_eq!(
        core.watch_set().to_sorted_vec(),
        vec![p("/project/a.ts"), entry()]
    );
}

#[test]
fn failed_initial_run_keeps_watching_by_default() {
    let mut core = core();
    core.step(ControllerEvent::Started);

    let commands = settle_err(&mut core, 1);

    assert!(commands.contains(&ControllerCommand::Report(Report::Watching)));
    assert!(core.is_accepting_changes());
    assert_eq!(core.take_fatal_error(), None);
}

#[test]
fn fatal_initial_failure_closes_the_controller() {
    let mut options = ControllerOptions::new("main.ts", "/project");
    options.fatal_initial_failure = true;
    let mut core = ControllerCore::new(options);
    core.step(ControllerEvent::Started);

    let commands = settle_err(&mut core, 1);

    assert_eq!(
        commands,
        vec![
            ControllerCommand::Report(Report::RunFailed {
                error: "boom".to_string(),
            }),
            ControllerCommand::CancelDebounce,
            ControllerCommand::CloseWatcher,
        ]
    );
    assert_eq!(core.phase(), Phase::Closing);

    let step = core.step(ControllerEvent::WatcherClosed);
    assert!(!step.keep_running);
    assert_eq!(core.phase(), Phase::Closed);
    assert_eq!(core.take_fatal_error(), Some("boom".to_string()));
}

#[test]
fn fatal_flag_only_applies_to_the_first_run() {
    let mut options = ControllerOptions::new("main.ts", "/project");
    options.fatal_initial_failure = true;
    let mut core = ControllerCore::new(options);
    core.step(ControllerEvent::Started);
    settle_ok(&mut core, 1, &[]);
    change(&mut core, "/project/main.ts");
    core.step(ControllerEvent::DebounceElapsed { generation: 1 });

    let commands = settle_err(&mut core, 2);

    assert!(!commands.contains(&ControllerCommand::CloseWatcher));
    assert_eq!(core.phase(), Phase::Idle);
}

#[test]
fn shutdown_when_idle_closes_immediately() {
    let mut core = idle_core();

    let step = core.step(ControllerEvent::ShutdownRequested);
    assert_eq!(
        step.commands,
        vec![
            ControllerCommand::CancelDebounce,
            ControllerCommand::CloseWatcher,
        ]
    );
    assert!(step.keep_running);

    // A second request changes nothing.
    let again = core.step(ControllerEvent::ShutdownRequested);
    assert!(again.commands.is_empty());

    let done = core.step(ControllerEvent::WatcherClosed);
    assert!(!done.keep_running);
    assert_eq!(core.phase(), Phase::Closed);
}

#[test]
fn shutdown_mid_run_waits_for_settlement() {
    let mut core = core();
    core.step(ControllerEvent::Started);

    let step = core.step(ControllerEvent::ShutdownRequested);
    assert_eq!(step.commands, vec![ControllerCommand::CancelDebounce]);
    assert_eq!(core.phase(), Phase::Closing);
    assert_eq!(core.in_flight(), Some(1));

    // Changes are no longer processed.
    assert!(change(&mut core, "/project/main.ts").is_empty());

    // The last run's error is dropped.
    let commands = settle_err(&mut core, 1);
    assert_eq!(commands, vec![ControllerCommand::CloseWatcher]);
    assert_eq!(core.in_flight(), None);

    let done = core.step(ControllerEvent::WatcherClosed);
    assert!(!done.keep_running);
}

#[test]
fn shutdown_while_debouncing_drops_pending_restart() {
    let mut core = idle_core();
    change(&mut core, "/project/main.ts");

    core.step(ControllerEvent::ShutdownRequested);
    let step = core.step(ControllerEvent::DebounceElapsed { generation: 1 });

    assert!(step.commands.is_empty());
    assert_eq!(core.runs_started(), 1);
}

#[test]
fn watcher_errors_are_reported_without_state_change() {
    let mut core = idle_core();

    let step = core.step(ControllerEvent::WatcherFailed {
        message: "inotify limit".to_string(),
    });

    assert_eq!(
        step.commands,
        vec![ControllerCommand::Report(Report::WatcherError {
            message: "inotify limit".to_string(),
        })]
    );
    assert_eq!(core.phase(), Phase::Idle);
}
