// src/exec/mod.rs

//! Run execution layer.
//!
//! - [`backend`] provides the `RunExecutor` trait the controller talks to,
//!   plus the request/output/error types.
//! - [`process`] is the production executor: it scans dependencies and runs
//!   the entry with an external runtime via `tokio::process::Command`.
//! - [`scanner`] discovers the files an entry imports.

pub mod backend;
pub mod process;
pub mod scanner;

pub use backend::{RunError, RunExecutor, RunOutput, RunRequest};
pub use process::ProcessExecutor;
pub use scanner::DependencyScanner;
