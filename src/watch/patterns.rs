// src/watch/patterns.rs

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};

use crate::config::model::ConfigFile;
use crate::errors::{BuildError, Result};
use crate::types::{ReloadKind, TaskName};
use crate::watch::path_utils::normalize_rel;

/// Association between a path pattern and the tasks to re-run when a
/// matching path changes.
///
/// Patterns are evaluated against `/`-separated paths relative to the
/// project root. A leading `./` is ignored, and `*` does not cross `/`
/// (use `**` for that).
#[derive(Clone)]
pub struct WatchBinding {
    pattern: String,
    matcher: GlobMatcher,
    tasks: Vec<TaskName>,
    reload: ReloadKind,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("pattern", &self.pattern)
            .field("tasks", &self.tasks)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new<I, S>(pattern: &str, tasks: I, reload: ReloadKind) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let normalized = normalize_rel(pattern);
        let matcher = GlobBuilder::new(&normalized)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                BuildError::ConfigError(format!("invalid watch pattern '{pattern}': {e}"))
            })?
            .compile_matcher();

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            tasks: tasks.into_iter().map(Into::into).collect(),
            reload,
        })
    }

    /// Pattern as written by the user.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Tasks to run, in order, when this binding fires.
    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn reload(&self) -> ReloadKind {
        self.reload
    }

    /// Returns true if `rel_path` (relative to project root) matches.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(normalize_rel(rel_path))
    }
}

/// Ordered collection of bindings. Overlapping patterns are allowed; every
/// matching binding fires independently.
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    bindings: Vec<WatchBinding>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding and return its index.
    pub fn bind<I, S>(&mut self, pattern: &str, tasks: I, reload: ReloadKind) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.bindings.push(WatchBinding::new(pattern, tasks, reload)?);
        Ok(self.bindings.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&WatchBinding> {
        self.bindings.get(index)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchBinding> {
        self.bindings.iter()
    }

    /// Indices of all bindings matching `rel_path`, in binding order.
    pub fn matching(&self, rel_path: &str) -> Vec<usize> {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.matches(rel_path))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Compile `[[watch.bind]]` entries, substituting `{src}` / `{dist}`.
pub fn bindings_from_config(cfg: &ConfigFile) -> Result<BindingSet> {
    let mut set = BindingSet::new();
    for binding in cfg.watch.bind.iter() {
        let pattern = cfg.expand_placeholders(&binding.pattern);
        set.bind(&pattern, binding.tasks.iter().cloned(), binding.reload)?;
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_dot_slash_is_ignored_on_both_sides() {
        let b = WatchBinding::new("./src/styles/**/*.scss", ["styles"], ReloadKind::Inject)
            .unwrap();
        assert!(b.matches("src/styles/main.scss"));
        assert!(b.matches("./src/styles/blocks/header.scss"));
        assert!(!b.matches("src/pages/index.pug"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let b = WatchBinding::new("src/assets/js/*.js", ["scripts"], ReloadKind::Full).unwrap();
        assert!(b.matches("src/assets/js/main.js"));
        assert!(!b.matches("src/assets/js/libs/jquery.js"));
    }

    #[test]
    fn overlapping_bindings_all_match() {
        let mut set = BindingSet::new();
        set.bind("src/**/*", ["copy"], ReloadKind::Full).unwrap();
        set.bind("src/pages/*.pug", ["pug"], ReloadKind::Full).unwrap();
        set.bind("*.svg", ["icons"], ReloadKind::None).unwrap();

        assert_eq!(set.matching("src/pages/index.pug"), vec![0, 1]);
        assert_eq!(set.matching("logo.svg"), vec![2]);
        assert!(set.matching("README.md").is_empty());
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = WatchBinding::new("src/[", ["x"], ReloadKind::Full).unwrap_err();
        assert!(matches!(err, BuildError::ConfigError(_)));
    }
}
