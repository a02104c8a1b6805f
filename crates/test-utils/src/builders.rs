#![allow(dead_code)]

use std::collections::BTreeMap;

use assetdag::config::{
    BindingConfig, ConfigFile, LibsSection, PathsSection, RawConfigFile, TaskConfig,
    WatchSection,
};
use assetdag::errors::Result;
use assetdag::types::ReloadKind;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                paths: PathsSection::default(),
                libs: LibsSection::default(),
                watch: WatchSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_paths(mut self, src: &str, dist: &str) -> Self {
        self.config.paths = PathsSection {
            src: src.to_string(),
            dist: dist.to_string(),
        };
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    /// Add a `command` task.
    pub fn with_command(self, name: &str, cmd: &str) -> Self {
        self.with_task(name, TaskConfig::Command { cmd: cmd.to_string() })
    }

    pub fn with_sequence(self, name: &str, children: &[&str]) -> Self {
        self.with_task(
            name,
            TaskConfig::Sequence {
                tasks: children.iter().map(|c| c.to_string()).collect(),
            },
        )
    }

    pub fn with_parallel(self, name: &str, children: &[&str]) -> Self {
        self.with_task(
            name,
            TaskConfig::Parallel {
                tasks: children.iter().map(|c| c.to_string()).collect(),
            },
        )
    }

    pub fn with_binding(mut self, pattern: &str, tasks: &[&str], reload: ReloadKind) -> Self {
        self.config.watch.bind.push(BindingConfig {
            pattern: pattern.to_string(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            reload,
        });
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
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
