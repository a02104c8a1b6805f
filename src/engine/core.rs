// src/engine/core.rs

//! Pure dispatch state machine.
//!
//! This module decides, for every debounced change, which bindings fire and
//! when. It owns:
//! - the compiled [`BindingSet`],
//! - per-binding run state (running / queued path),
//! - the set of task names currently being run by some binding.
//!
//! It has no channels, no Tokio types and performs no IO, so it is unit
//! tested directly. The async shell (`engine::runtime::Dispatcher`) feeds
//! it events and completions and executes the [`StartRun`]s it returns.
//!
//! Rules:
//! - every binding whose pattern matches a changed path fires;
//! - a binding never has two runs in flight;
//! - a task is never run by two bindings at once, including when one
//!   binding reaches it through a composite;
//! - a binding that cannot start right away remembers the newest path and
//!   runs exactly once when it becomes unblocked.

use std::collections::HashSet;

use tracing::debug;

use crate::engine::ChangeEvent;
use crate::errors::Result;
use crate::types::{ReloadKind, TaskName};
use crate::watch::BindingSet;

/// Instruction for the shell: run `tasks` in order for `binding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRun {
    pub binding: usize,
    pub path: String,
    pub tasks: Vec<TaskName>,
    pub reload: ReloadKind,
}

#[derive(Debug, Clone, Default)]
struct BindingState {
    running: bool,
    queued: Option<String>,
    /// Every task name the binding's run may execute: its own tasks plus
    /// all composite descendants.
    locks: HashSet<TaskName>,
}

impl BindingState {
    fn for_tasks(tasks: &[TaskName]) -> Self {
        Self {
            locks: tasks.iter().cloned().collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct DispatchCore {
    bindings: BindingSet,
    states: Vec<BindingState>,
    busy_tasks: HashSet<TaskName>,
}

impl DispatchCore {
    pub fn new(bindings: BindingSet) -> Self {
        let states = bindings
            .iter()
            .map(|b| BindingState::for_tasks(b.tasks()))
            .collect();
        Self {
            bindings,
            states,
            busy_tasks: HashSet::new(),
        }
    }

    /// Add a binding after construction and return its index.
    pub fn bind<I, S>(&mut self, pattern: &str, tasks: I, reload: ReloadKind) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let index = self.bindings.bind(pattern, tasks, reload)?;
        let state = self
            .bindings
            .get(index)
            .map(|b| BindingState::for_tasks(b.tasks()))
            .unwrap_or_default();
        self.states.push(state);
        Ok(index)
    }

    /// Widen every binding's lock set with the descendants of its tasks.
    ///
    /// `children` returns the direct children of a composite task and
    /// nothing for a leaf.
    pub fn expand_locks<F>(&mut self, children: F)
    where
        F: Fn(&str) -> Vec<TaskName>,
    {
        for (binding, state) in self.bindings.iter().zip(self.states.iter_mut()) {
            let mut stack: Vec<TaskName> = binding.tasks().to_vec();
            while let Some(task) = stack.pop() {
                for child in children(&task) {
                    if state.locks.insert(child.clone()) {
                        stack.push(child);
                    }
                }
                state.locks.insert(task);
            }
        }
    }

    /// Task names locked by `binding` while it runs.
    pub fn locks(&self, binding: usize) -> Option<&HashSet<TaskName>> {
        self.states.get(binding).map(|s| &s.locks)
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// True when nothing is running and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.states
            .iter()
            .all(|s| !s.running && s.queued.is_none())
    }

    pub fn is_running(&self, binding: usize) -> bool {
        self.states.get(binding).is_some_and(|s| s.running)
    }

    /// Handle one (already debounced) change.
    pub fn on_change(&mut self, event: &ChangeEvent) -> Vec<StartRun> {
        let matching = self.bindings.matching(&event.path);
        if matching.is_empty() {
            debug!(path = %event.path, "change matched no binding");
            return Vec::new();
        }

        for index in matching {
            if let Some(state) = self.states.get_mut(index) {
                if state.queued.is_some() || state.running {
                    debug!(binding = index, path = %event.path, "coalescing re-trigger");
                }
                state.queued = Some(event.path.clone());
            }
        }

        self.start_ready()
    }

    /// Handle completion of a binding's run, returning runs that became
    /// unblocked.
    pub fn on_finished(&mut self, binding: usize) -> Vec<StartRun> {
        let Some(state) = self.states.get_mut(binding) else {
            return Vec::new();
        };
        if !state.running {
            debug!(binding, "finish for a binding that was not running");
            return Vec::new();
        }
        state.running = false;
        for task in &state.locks {
            self.busy_tasks.remove(task);
        }

        self.start_ready()
    }

    fn start_ready(&mut self) -> Vec<StartRun> {
        let mut started = Vec::new();

        for (index, binding) in self.bindings.iter().enumerate() {
            let state = &mut self.states[index];
            if state.running || state.queued.is_none() {
                continue;
            }
            if !state.locks.is_disjoint(&self.busy_tasks) {
                debug!(binding = index, "binding blocked by a running task");
                continue;
            }

            let Some(path) = state.queued.take() else {
                continue;
            };
            state.running = true;
            self.busy_tasks.extend(state.locks.iter().cloned());

            started.push(StartRun {
                binding: index,
                path,
                tasks: binding.tasks().to_vec(),
                reload: binding.reload(),
            });
        }

        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> DispatchCore {
        let mut set = BindingSet::new();
        set.bind("./src/styles/**/*.scss", ["styles"], ReloadKind::Inject)
            .unwrap();
        set.bind("src/pages/*.pug", ["compile:pug"], ReloadKind::Full)
            .unwrap();
        set.bind("src/**/*.svg", ["icons", "compile:pug"], ReloadKind::Full)
            .unwrap();
        DispatchCore::new(set)
    }

    #[test]
    fn matching_binding_fires_with_its_tasks() {
        let mut core = core();
        let runs = core.on_change(&ChangeEvent::modified("src/styles/blocks/header.scss"));
        assert_eq!(
            runs,
            vec![StartRun {
                binding: 0,
                path: "src/styles/blocks/header.scss".into(),
                tasks: vec!["styles".into()],
                reload: ReloadKind::Inject,
            }]
        );
        assert!(!core.is_idle());

        assert!(core.on_finished(0).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn unmatched_change_starts_nothing() {
        let mut core = core();
        assert!(core.on_change(&ChangeEvent::modified("README.md")).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn retrigger_while_running_is_coalesced_to_the_newest_path() {
        let mut core = core();
        assert_eq!(core.on_change(&ChangeEvent::modified("src/styles/a.scss")).len(), 1);

        assert!(core.on_change(&ChangeEvent::modified("src/styles/b.scss")).is_empty());
        assert!(core.on_change(&ChangeEvent::modified("src/styles/c.scss")).is_empty());

        let next = core.on_finished(0);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].path, "src/styles/c.scss");

        assert!(core.on_finished(0).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn shared_task_never_runs_twice_at_once() {
        let mut core = core();
        let first = core.on_change(&ChangeEvent::modified("src/pages/index.pug"));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].binding, 1);

        // The svg binding also runs compile:pug, so it has to wait.
        assert!(core.on_change(&ChangeEvent::modified("src/assets/svg/logo.svg")).is_empty());

        let next = core.on_finished(1);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].binding, 2);
        assert_eq!(next[0].tasks, vec!["icons".to_string(), "compile:pug".to_string()]);
    }

    #[test]
    fn composite_binding_locks_its_descendants() {
        let mut set = BindingSet::new();
        set.bind("src/**/*.scss", ["build"], ReloadKind::Full).unwrap();
        set.bind("src/styles/*.scss", ["styles"], ReloadKind::Inject)
            .unwrap();
        let mut core = DispatchCore::new(set);
        core.expand_locks(|task| match task {
            "build" => vec!["assets".into()],
            "assets" => vec!["styles".into(), "scripts".into()],
            _ => Vec::new(),
        });

        let locked: HashSet<TaskName> = ["build", "assets", "styles", "scripts"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(core.locks(0), Some(&locked));

        let runs = core.on_change(&ChangeEvent::modified("src/styles/main.scss"));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].binding, 0);

        let next = core.on_finished(0);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].binding, 1);
        assert!(core.on_finished(1).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn spurious_finish_is_ignored() {
        let mut core = core();
        assert!(core.on_finished(0).is_empty());
        assert!(core.on_finished(42).is_empty());
    }

    #[test]
    fn bindings_can_be_added_later() {
        let mut core = DispatchCore::default();
        let index = core.bind("*.svg", ["icons"], ReloadKind::None).unwrap();
        assert_eq!(index, 0);
        assert_eq!(core.binding_count(), 1);
        assert_eq!(core.on_change(&ChangeEvent::modified("logo.svg")).len(), 1);
        assert!(core.is_running(0));
    }
}
