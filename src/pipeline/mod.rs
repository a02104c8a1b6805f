// src/pipeline/mod.rs

//! Asset pipeline: the leaf tasks a config file can declare, and the
//! builder that turns a validated [`ConfigFile`] into a [`TaskRegistry`].

pub mod clean;
pub mod command;
pub mod copy;
pub mod icons;
pub mod scripts;
pub mod sources;
pub mod styles;
pub mod templates;
pub mod tool;
pub mod watch_task;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{ConfigFile, TaskConfig};
use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::registry::TaskRegistry;
use crate::server::{DevServer, LiveReload, ServerTask};
use crate::watch::bindings_from_config;

pub use clean::CleanTask;
pub use command::CommandTask;
pub use copy::CopyTask;
pub use icons::{IconsTask, SpriteBuilder, SpriteOptions};
pub use scripts::ScriptsTask;
pub use styles::{BundleInputs, StylesTask};
pub use templates::{TemplateOptions, TemplatesTask};
pub use tool::ExternalTool;
pub use watch_task::{WatchOptions, WatchTask};

/// Run synchronous filesystem work off the async workers.
pub(crate) async fn blocking<F, T>(task: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|join_err| {
        BuildError::Other(anyhow::Error::new(join_err).context(format!("task '{task}' panicked")))
    })?
}

/// Read a whole file on the blocking pool.
pub(crate) async fn read_file(task: &str, fs: &Arc<dyn FileSystem>, path: &Path) -> Result<Vec<u8>> {
    let fs = Arc::clone(fs);
    let (name, path) = (task.to_string(), path.to_path_buf());
    blocking(task, move || fs.read(&path).map_err(|e| BuildError::io(&name, &path, e))).await
}

/// Write a file, creating its parents, on the blocking pool.
pub(crate) async fn write_file(
    task: &str,
    fs: &Arc<dyn FileSystem>,
    path: &Path,
    contents: Vec<u8>,
) -> Result<()> {
    let fs = Arc::clone(fs);
    let (name, path) = (task.to_string(), path.to_path_buf());
    blocking(task, move || {
        fs.write(&path, &contents)
            .map_err(|e| BuildError::io(&name, &path, e))
    })
    .await
}

/// Everything the pipeline tasks share.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Project root; `paths.src`, `paths.dist` and library paths are
    /// relative to it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub live: LiveReload,
}

impl PipelineContext {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            live: LiveReload::new(),
        }
    }
}

fn tool_for(cfg: &ConfigFile, cmd: &Option<String>) -> Option<ExternalTool> {
    cmd.as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| ExternalTool::new(cfg.expand_placeholders(c)))
}

fn join_rel(base: &Path, rel: &str) -> PathBuf {
    let rel = rel.trim_start_matches("./").trim_start_matches('/');
    if rel.is_empty() {
        base.to_path_buf()
    } else {
        base.join(rel)
    }
}

/// Populate a fresh registry from `cfg`, children before composites.
pub fn build_registry(cfg: &ConfigFile, ctx: &PipelineContext) -> Result<Arc<TaskRegistry>> {
    let registry = Arc::new(TaskRegistry::new());
    let fs = &ctx.fs;
    let src_dir = join_rel(&ctx.root, &cfg.paths.src);
    let dist_dir = join_rel(&ctx.root, &cfg.paths.dist);

    for name in cfg.registration_order() {
        let Some(task) = cfg.task.get(name) else {
            return Err(BuildError::UnknownTask(name.clone()));
        };
        debug!(task = %name, kind = task.kind_name(), "building task");

        match task {
            TaskConfig::Sequence { tasks } => {
                registry.register_sequence(name.as_str(), tasks.iter().cloned())?
            }
            TaskConfig::Parallel { tasks } => {
                registry.register_parallel(name.as_str(), tasks.iter().cloned())?
            }
            TaskConfig::Clean => registry.register(
                name.as_str(),
                CleanTask::new(name.as_str(), Arc::clone(fs), &dist_dir),
            )?,
            TaskConfig::Templates {
                src,
                cmd,
                pretty,
                pretty_flag,
                dest,
            } => registry.register(
                name.as_str(),
                TemplatesTask::new(
                    name.as_str(),
                    Arc::clone(fs),
                    &ctx.root,
                    &src_dir,
                    src.as_str(),
                    TemplateOptions {
                        cmd: cfg.expand_placeholders(cmd),
                        pretty: *pretty,
                        pretty_flag: pretty_flag.clone(),
                    },
                    join_rel(&dist_dir, dest),
                ),
            )?,
            TaskConfig::Styles { src, output, cmd } => registry.register(
                name.as_str(),
                StylesTask::new(
                    name.as_str(),
                    Arc::clone(fs),
                    BundleInputs {
                        root: ctx.root.clone(),
                        libs: cfg.libs.styles.clone(),
                        src_dir: src_dir.clone(),
                        sources: src.clone(),
                    },
                    join_rel(&dist_dir, output),
                    tool_for(cfg, cmd),
                ),
            )?,
            TaskConfig::Scripts { src, output, cmd } => registry.register(
                name.as_str(),
                ScriptsTask::new(
                    name.as_str(),
                    Arc::clone(fs),
                    BundleInputs {
                        root: ctx.root.clone(),
                        libs: cfg.libs.scripts.clone(),
                        src_dir: src_dir.clone(),
                        sources: src.clone(),
                    },
                    join_rel(&dist_dir, output),
                    tool_for(cfg, cmd),
                ),
            )?,
            TaskConfig::Icons {
                src,
                output,
                strip_attrs,
                id_prefix,
                sprite_width,
            } => registry.register(
                name.as_str(),
                IconsTask::new(
                    name.as_str(),
                    Arc::clone(fs),
                    &src_dir,
                    src.as_str(),
                    join_rel(&dist_dir, output),
                    &SpriteOptions {
                        strip_attrs: strip_attrs.clone(),
                        id_prefix: id_prefix.clone(),
                        width: sprite_width.clone(),
                    },
                )?,
            )?,
            TaskConfig::Copy { src, dest } => registry.register(
                name.as_str(),
                CopyTask::new(
                    name.as_str(),
                    Arc::clone(fs),
                    &src_dir,
                    src.as_str(),
                    join_rel(&dist_dir, dest),
                ),
            )?,
            TaskConfig::Command { cmd } => registry.register(
                name.as_str(),
                CommandTask::new(name.as_str(), cfg.expand_placeholders(cmd), &ctx.root),
            )?,
            TaskConfig::Watch => registry.register(
                name.as_str(),
                WatchTask::new(
                    Arc::downgrade(&registry),
                    bindings_from_config(cfg)?,
                    Arc::clone(fs),
                    &ctx.root,
                    &src_dir,
                    &dist_dir,
                    WatchOptions {
                        debounce: Duration::from_millis(cfg.watch.debounce_ms),
                        use_hash: cfg.watch.use_hash,
                    },
                    ctx.live.clone(),
                ),
            )?,
            TaskConfig::Server { host, port } => registry.register(
                name.as_str(),
                ServerTask::new(DevServer::new(
                    host.as_str(),
                    *port,
                    &dist_dir,
                    Arc::clone(fs),
                    ctx.live.clone(),
                )),
            )?,
        }
    }

    Ok(registry)
}
