// src/config/model.rs

use serde::Deserialize;

use crate::exec::scanner::DEFAULT_EXTENSIONS;

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [run]
/// runtime = "node"
/// runtime_args = ["--enable-source-maps"]
///
/// [watch]
/// debounce_ms = 50
/// exclude = ["**/node_modules/**"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub run: RunSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(run: RunSection, watch: WatchSection) -> Self {
        Self { run, watch }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RunSection::default(), WatchSection::default())
    }
}

/// `[run]` section: how the entry file is executed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Program that executes the entry (looked up on `PATH`).
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Arguments placed before the entry path.
    #[serde(default)]
    pub runtime_args: Vec<String>,

    /// Extensions tried when resolving extensionless imports, in order.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_runtime() -> String {
    "node".to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            runtime_args: Vec::new(),
            extensions: default_extensions(),
        }
    }
}

/// `[watch]` section: watch-mode behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Quiet period after the last change before re-running.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Glob patterns for dependency paths that should not be watched.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Skip `change` events whose file content is byte-identical.
    #[serde(default)]
    pub use_hash: bool,

    /// Abort watch mode when the very first run fails.
    #[serde(default)]
    pub fatal_initial_failure: bool,
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            exclude: Vec::new(),
            use_hash: false,
            fatal_initial_failure: false,
        }
    }
}
