// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{BuildError, Result};
use crate::types::TaskName;
use crate::watch::path_utils::normalize_rel;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let order = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, order))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<Vec<TaskName>> {
    ensure_has_tasks(cfg)?;
    validate_paths(cfg)?;
    validate_children(cfg)?;
    validate_bindings(cfg)?;
    validate_task_options(cfg)?;
    registration_order(cfg)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(BuildError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let src = project_subdir("src", &cfg.paths.src)?;
    let dist = project_subdir("dist", &cfg.paths.dist)?;

    // `clean` wipes dist, so it must never overlap the source tree.
    if src.starts_with(&dist) || dist.starts_with(&src) {
        return Err(BuildError::ConfigError(format!(
            "[paths].src ('{}') and [paths].dist ('{}') must not overlap",
            cfg.paths.src, cfg.paths.dist
        )));
    }
    Ok(())
}

/// Normalise a `[paths]` entry into the directory it names below the
/// project root. Rejects entries that resolve to the root itself or leave it.
fn project_subdir(field: &str, value: &str) -> Result<PathBuf> {
    let normalized = normalize_rel(value);
    let mut dir = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => dir.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(BuildError::ConfigError(format!(
                    "[paths].{field} = '{value}' must stay inside the project root"
                )));
            }
        }
    }
    if dir.as_os_str().is_empty() {
        return Err(BuildError::ConfigError(format!(
            "[paths].{field} = '{value}' must name a directory below the project root"
        )));
    }
    Ok(dir)
}

fn validate_children(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for child in task.children() {
            if child == name {
                return Err(BuildError::ConfigError(format!(
                    "task '{}' cannot include itself",
                    name
                )));
            }
            if !cfg.task.contains_key(child) {
                return Err(BuildError::ConfigError(format!(
                    "task '{}' references unknown task '{}'",
                    name, child
                )));
            }
        }
    }
    Ok(())
}

fn validate_bindings(cfg: &RawConfigFile) -> Result<()> {
    for (idx, binding) in cfg.watch.bind.iter().enumerate() {
        if binding.tasks.is_empty() {
            return Err(BuildError::ConfigError(format!(
                "[[watch.bind]] #{idx} ('{}') lists no tasks",
                binding.pattern
            )));
        }
        for task in binding.tasks.iter() {
            if !cfg.task.contains_key(task) {
                return Err(BuildError::ConfigError(format!(
                    "[[watch.bind]] #{idx} ('{}') references unknown task '{}'",
                    binding.pattern, task
                )));
            }
        }
    }

    if !cfg.watch.bind.is_empty()
        && !cfg.task.values().any(|t| matches!(t, TaskConfig::Watch))
    {
        tracing::warn!("[[watch.bind]] entries present but no task has kind = \"watch\"");
    }

    Ok(())
}

fn validate_task_options(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if let TaskConfig::Icons { strip_attrs, .. } = task {
            Regex::new(strip_attrs).map_err(|e| {
                BuildError::ConfigError(format!(
                    "task '{}' has invalid strip_attrs regex: {}",
                    name, e
                ))
            })?;
        }
    }
    Ok(())
}

/// Check the composite graph for cycles and return a registration order in
/// which every child precedes the composites that reference it.
fn registration_order(cfg: &RawConfigFile) -> Result<Vec<TaskName>> {
    // Edge direction: child -> composite.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for child in task.children() {
            graph.add_edge(child.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(BuildError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                node
            )))
        }
    }
}
