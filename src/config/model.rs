// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{ReloadKind, TaskName};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [paths]
/// src = "src"
/// dist = "dist"
///
/// [libs]
/// styles = ["node_modules/normalize.css/normalize.css"]
///
/// [task.styles]
/// kind = "styles"
/// src = ["styles/main.scss"]
/// output = "assets/css/main-min.css"
///
/// [task.default]
/// kind = "sequence"
/// tasks = ["clean", "styles"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub libs: LibsSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<TaskName, TaskConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holding one means the
/// task graph is acyclic and every reference resolves.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub libs: LibsSection,
    pub watch: WatchSection,
    pub task: BTreeMap<TaskName, TaskConfig>,
    /// Task names ordered so that every composite comes after its children.
    registration_order: Vec<TaskName>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, registration_order: Vec<TaskName>) -> Self {
        Self {
            paths: raw.paths,
            libs: raw.libs,
            watch: raw.watch,
            task: raw.task,
            registration_order,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<TaskName, TaskConfig> {
        &self.task
    }

    /// Order in which tasks must be registered (children first).
    pub fn registration_order(&self) -> &[TaskName] {
        &self.registration_order
    }

    /// Substitute `{src}` and `{dist}` in a user-supplied string.
    pub fn expand_placeholders(&self, s: &str) -> String {
        s.replace("{src}", &self.paths.src)
            .replace("{dist}", &self.paths.dist)
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_dist")]
    pub dist: String,
}

fn default_src() -> String {
    "src".to_string()
}

fn default_dist() -> String {
    "dist".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
        }
    }
}

/// `[libs]` section: third-party files prepended to the project's own
/// sources, relative to the project root.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LibsSection {
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<String>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Trailing-edge debounce window per path, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Drop change events whose file content hash did not change.
    #[serde(default)]
    pub use_hash: bool,

    #[serde(default)]
    pub bind: Vec<BindingConfig>,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            use_hash: false,
            bind: Vec::new(),
        }
    }
}

/// One `[[watch.bind]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingConfig {
    pub pattern: String,
    pub tasks: Vec<TaskName>,
    #[serde(default)]
    pub reload: ReloadKind,
}

/// `[task.<name>]` section, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskConfig {
    /// Remove everything inside `paths.dist`.
    Clean,

    /// Render each matching page through an external template tool.
    Templates {
        src: String,
        cmd: String,
        #[serde(default = "default_true")]
        pretty: bool,
        #[serde(default = "default_pretty_flag")]
        pretty_flag: String,
        #[serde(default)]
        dest: String,
    },

    /// Concatenate style libs + sources and pipe them through a style tool.
    Styles {
        src: Vec<String>,
        output: String,
        #[serde(default)]
        cmd: Option<String>,
    },

    /// Concatenate script libs + sources and pipe them through a script tool.
    Scripts {
        src: Vec<String>,
        output: String,
        #[serde(default)]
        cmd: Option<String>,
    },

    /// Pack SVG files into a single symbol sprite.
    Icons {
        src: String,
        output: String,
        #[serde(default = "default_strip_attrs")]
        strip_attrs: String,
        #[serde(default = "default_id_prefix")]
        id_prefix: String,
        #[serde(default)]
        sprite_width: Option<String>,
    },

    /// Mirror matching files byte-for-byte under `dest`.
    Copy { src: String, dest: String },

    /// Arbitrary shell command run from the project root.
    Command { cmd: String },

    Sequence { tasks: Vec<TaskName> },

    Parallel { tasks: Vec<TaskName> },

    /// Run the watch dispatcher over `[watch]` bindings.
    Watch,

    /// Serve `paths.dist` with live reload.
    Server {
        #[serde(default = "default_host")]
        host: String,
        #[serde(default = "default_port")]
        port: u16,
    },
}

fn default_true() -> bool {
    true
}

fn default_pretty_flag() -> String {
    "--pretty".to_string()
}

fn default_strip_attrs() -> String {
    "^(width|height|data.*)$".to_string()
}

fn default_id_prefix() -> String {
    "icon-".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl TaskConfig {
    /// Children of a composite task, empty for leaves.
    pub fn children(&self) -> &[TaskName] {
        match self {
            TaskConfig::Sequence { tasks } | TaskConfig::Parallel { tasks } => tasks,
            _ => &[],
        }
    }

    /// Short label used in dry-run output and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TaskConfig::Clean => "clean",
            TaskConfig::Templates { .. } => "templates",
            TaskConfig::Styles { .. } => "styles",
            TaskConfig::Scripts { .. } => "scripts",
            TaskConfig::Icons { .. } => "icons",
            TaskConfig::Copy { .. } => "copy",
            TaskConfig::Command { .. } => "command",
            TaskConfig::Sequence { .. } => "sequence",
            TaskConfig::Parallel { .. } => "parallel",
            TaskConfig::Watch => "watch",
            TaskConfig::Server { .. } => "server",
        }
    }
}
