use rono::config::{ConfigFile, RawConfigFile};
use rono::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn runtime(mut self, program: &str) -> Self {
        self.config.run.runtime = program.to_string();
        self
    }

    pub fn runtime_arg(mut self, arg: &str) -> Self {
        self.config.run.runtime_args.push(arg.to_string());
        self
    }

    pub fn extensions(mut self, exts: &[&str]) -> Self {
        self.config.run.extensions = exts.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn fatal_initial_failure(mut self, val: bool) -> Self {
        self.config.watch.fatal_initial_failure = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
