// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod report;
pub mod signals;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{CliArgs, USAGE};
use crate::config::{ConfigFile, build_exclude_set, resolve_config, validate_config};
use crate::engine::{Controller, ControllerCore, ControllerOptions};
use crate::exec::{ProcessExecutor, RunExecutor, RunRequest};
use crate::fs::{FileSystem, RealFileSystem};
use crate::report::{ConsoleReporter, Report, Reporter};
use crate::watch::path_utils::normalize_path;
use crate::watch::{NotifyWatcher, WatcherEvent, WatcherOptions};

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the process executor
/// - (in watch mode) the file watcher, controller and signal handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let Some(entry_arg) = args.entry() else {
        eprintln!("Usage: {USAGE}");
        return Ok(1);
    };

    let cfg = effective_config(&args)?;
    let cwd = std::env::current_dir().context("reading current working directory")?;
    let entry = resolve_entry(&RealFileSystem, &cwd, entry_arg);
    let script_args = args.script_args();

    let executor = ProcessExecutor::from_config(&cfg.run)?;
    debug!(runtime = executor.runtime(), ?entry, "executor configured");

    if args.watch {
        watch(cfg, cwd, entry, script_args, executor).await
    } else {
        run_once(&cwd, entry, script_args, &executor).await
    }
}

/// Absolute path of the entry argument, resolved against `cwd`.
///
/// Symlinks are resolved so the entry matches the canonical paths the
/// dependency scanner reports; a missing file keeps its lexical path and is
/// reported by the executor.
pub fn resolve_entry(fs: &dyn FileSystem, cwd: &Path, entry_arg: &str) -> PathBuf {
    let lexical = normalize_path(cwd, Path::new(entry_arg));
    match fs.canonicalize(&lexical) {
        Ok(canonical) => canonical,
        Err(err) => {
            debug!(error = %err, ?lexical, "entry not canonicalized");
            lexical
        }
    }
}

/// Load the config file (if any) and apply CLI overrides on top.
pub fn effective_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut cfg = resolve_config(args.config.as_deref())?;

    if let Some(ms) = args.debounce_ms {
        cfg.watch.debounce_ms = ms;
    }
    if let Some(runtime) = &args.runtime {
        cfg.run.runtime = runtime.clone();
    }

    validate_config(&cfg)?;
    Ok(cfg)
}

async fn run_once<E: RunExecutor>(
    cwd: &Path,
    entry: PathBuf,
    script_args: Vec<String>,
    executor: &E,
) -> Result<i32> {
    let mut reporter = ConsoleReporter::new(cwd);
    let request = RunRequest::new(entry, script_args);

    match executor.execute(request).await {
        Ok(output) => {
            debug!(
                dependencies = output.dependency_files.len(),
                "single run finished"
            );
            Ok(0)
        }
        Err(err) => {
            reporter.report(&Report::RunFailed {
                error: format!("{:?}", anyhow::Error::new(err)),
            });
            Ok(1)
        }
    }
}

async fn watch(
    cfg: ConfigFile,
    cwd: PathBuf,
    entry: PathBuf,
    script_args: Vec<String>,
    executor: ProcessExecutor,
) -> Result<i32> {
    let (tx, rx) = mpsc::unbounded_channel::<WatcherEvent>();
    let notifier = NotifyWatcher::new(
        tx,
        WatcherOptions {
            use_hash: cfg.watch.use_hash,
        },
    )?;

    let mut options = ControllerOptions::new(entry, cwd.clone());
    options.debounce = Duration::from_millis(cfg.watch.debounce_ms);
    options.exclude = build_exclude_set(&cfg.watch.exclude)?;
    options.fatal_initial_failure = cfg.watch.fatal_initial_failure;

    let core = ControllerCore::new(options);
    let controller = Controller::new(
        core,
        executor,
        notifier,
        rx,
        Box::new(ConsoleReporter::new(&cwd)),
        script_args,
    );

    let shutdown = CancellationToken::new();
    let signals = signals::cancel_on_signals(shutdown.clone());

    info!("entering watch mode");
    controller.run(shutdown).await?;
    signals.abort();
    Ok(0)
}
