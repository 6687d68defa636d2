#![allow(dead_code)]

use assetpipe::config::{
    ActionKind, ConfigFile, PipelineConfig, RawConfigFile, ResourceConfig, TaskConfig,
    WatchConfig,
};
use assetpipe::errors::Result;
use assetpipe::types::BusyPolicy;

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn site(mut self, dir: &str) -> Self {
        self.config.config.site = dir.to_string();
        self
    }

    pub fn on_busy(mut self, policy: BusyPolicy) -> Self {
        self.config.config.on_busy = policy;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    /// `[paths.<key>]` with the given sources and output directory.
    pub fn with_resource(mut self, key: &str, src: &[&str], dest: Option<&str>) -> Self {
        self.config.paths.insert(
            key.to_string(),
            ResourceConfig {
                src: src.iter().map(|s| s.to_string()).collect(),
                dest: dest.map(str::to_string),
                watch: Vec::new(),
            },
        );
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_pipeline(mut self, name: &str, steps: &[&str]) -> Self {
        self.config.pipeline.insert(
            name.to_string(),
            PipelineConfig {
                steps: steps.iter().map(|s| s.to_string()).collect(),
                description: None,
            },
        );
        self
    }

    pub fn with_watch(mut self, name: &str, watch: WatchConfig) -> Self {
        self.config.watch.insert(name.to_string(), watch);
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

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// Task running an external command.
    pub fn cmd(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    /// Task using a built-in action.
    pub fn action(kind: ActionKind) -> Self {
        Self {
            task: TaskConfig {
                action: Some(kind),
                ..TaskConfig::default()
            },
        }
    }

    pub fn resource(mut self, key: &str) -> Self {
        self.task.resource = Some(key.to_string());
        self
    }

    pub fn resources(mut self, keys: &[&str]) -> Self {
        self.task.resources = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.task.suffix = Some(suffix.to_string());
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.task.prefix = Some(prefix.to_string());
        self
    }

    pub fn dir(mut self, dir: &str) -> Self {
        self.task.dir = Some(dir.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
