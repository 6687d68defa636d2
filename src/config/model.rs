// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::BusyPolicy;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// site = "build"
///
/// [paths.js]
/// src = ["js/script.js"]
/// dest = "build/js"
/// watch = ["js/**/*.js"]
///
/// [task.js]
/// action = "include"
/// resource = "js"
/// suffix = ".min"
///
/// [pipeline.build]
/// steps = ["clean", "js"]
///
/// [watch.js]
/// resource = "js"
/// run = "js"
/// ```
///
/// All sections are optional and have reasonable defaults; validation
/// happens in `TryFrom<RawConfigFile> for ConfigFile`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// `[paths.<resource>]` sections, keyed by logical resource name.
    #[serde(default)]
    pub paths: BTreeMap<String, ResourceConfig>,

    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    #[serde(default)]
    pub pipeline: BTreeMap<String, PipelineConfig>,

    #[serde(default)]
    pub watch: BTreeMap<String, WatchConfig>,

    #[serde(default)]
    pub server: ServerConfig,
}

/// A validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    paths: BTreeMap<String, ResourceConfig>,
    task: BTreeMap<String, TaskConfig>,
    pipeline: BTreeMap<String, PipelineConfig>,
    watch: BTreeMap<String, WatchConfig>,
    server: ServerConfig,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            paths: raw.paths,
            task: raw.task,
            pipeline: raw.pipeline,
            watch: raw.watch,
            server: raw.server,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn paths(&self) -> &BTreeMap<String, ResourceConfig> {
        &self.paths
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn pipelines(&self) -> &BTreeMap<String, PipelineConfig> {
        &self.pipeline
    }

    pub fn watches(&self) -> &BTreeMap<String, WatchConfig> {
        &self.watch
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Output root, relative to the project root. Served by the dev server
    /// and never watched.
    #[serde(default = "default_site")]
    pub site: String,

    /// Quiet period after the last file event before a batch is flushed.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// `"coalesce"` (default) or `"overlap"`.
    #[serde(default)]
    pub on_busy: BusyPolicy,

    /// Extra glob patterns that are never watched nor used as sources.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_site() -> String {
    "build".to_string()
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_ignore() -> Vec<String> {
    vec![".git/**".to_string(), "node_modules/**".to_string()]
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            site: default_site(),
            debounce_ms: default_debounce_ms(),
            on_busy: BusyPolicy::default(),
            ignore: default_ignore(),
        }
    }
}

/// `[paths.<resource>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Source globs, relative to the project root.
    #[serde(default)]
    pub src: Vec<String>,

    /// Output directory, relative to the project root.
    #[serde(default)]
    pub dest: Option<String>,

    /// Globs whose changes should rebuild this resource.
    #[serde(default)]
    pub watch: Vec<String>,
}

/// Built-in file actions a task can use instead of an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Clean,
    Copy,
    Include,
    Sass,
    RenamePrefix,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Clean => "clean",
            ActionKind::Copy => "copy",
            ActionKind::Include => "include",
            ActionKind::Sass => "sass",
            ActionKind::RenamePrefix => "rename_prefix",
        }
    }
}

/// `[task.<name>]` section.
///
/// Exactly one of `cmd` / `action` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// External command, run through the platform shell in the project root.
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub action: Option<ActionKind>,

    /// Resource key for `include`, `sass` and `rename_prefix`.
    #[serde(default)]
    pub resource: Option<String>,

    /// Resource keys for `copy`.
    #[serde(default)]
    pub resources: Vec<String>,

    /// Extra basename suffix for the second output (e.g. `".min"`).
    #[serde(default)]
    pub suffix: Option<String>,

    /// File name prefix for `rename_prefix`.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Directory removed by `clean`; defaults to the site dir.
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// `[pipeline.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Ordered task (or pipeline) names.
    pub steps: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// `[watch.<name>]` section: one watch binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Explicit watch globs.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Use the `watch` globs of this resource (added to `patterns`).
    #[serde(default)]
    pub resource: Option<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Task or pipeline to trigger.
    pub run: String,

    /// Push a live-reload after a successful run.
    #[serde(default = "default_true")]
    pub reload: bool,

    /// Skip the trigger when the watched content hash did not change.
    #[serde(default)]
    pub use_hash: bool,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Directory to serve; defaults to `[config].site`.
    #[serde(default)]
    pub root: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Open a browser once the server is listening.
    #[serde(default)]
    pub open: bool,

    /// Browser to open instead of the system default (e.g. `"firefox"`).
    #[serde(default)]
    pub browser: Option<String>,

    /// Allow any origin.
    #[serde(default)]
    pub cors: bool,

    /// Expose the server through a public quick tunnel.
    #[serde(default)]
    pub tunnel: bool,

    #[serde(default = "default_true")]
    pub live_reload: bool,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: None,
            host: default_host(),
            port: default_port(),
            open: false,
            browser: None,
            cors: false,
            tunnel: false,
            live_reload: true,
        }
    }
}

impl WatchConfig {
    /// Binding that watches `patterns` and runs `run`, with defaults elsewhere.
    pub fn new(run: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            patterns,
            resource: None,
            exclude: Vec::new(),
            run: run.into(),
            reload: true,
            use_hash: false,
        }
    }
}
