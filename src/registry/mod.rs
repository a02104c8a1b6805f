// src/registry/mod.rs

//! Task registry.
//!
//! Holds named tasks and composes them:
//! - leaf tasks are anything implementing [`Task`] (see [`FnTask`] for
//!   closures),
//! - a *sequence* runs named tasks one after another,
//! - a *parallel group* starts named tasks concurrently and joins them.
//!
//! Composite children must already be registered, so a composite can never
//! include itself directly or transitively. The registry is an ordinary
//! owned value; independent builds (e.g. tests) each construct their own.

pub mod composite;
pub mod task;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::errors::{BuildError, Result};
use crate::types::TaskName;

pub use composite::{Parallel, Sequence};
pub use task::{FnTask, Task, TaskFuture, TaskShape};

use composite::{run_named, NamedTask};

struct Entry {
    task: Arc<dyn Task>,
    shape: TaskShape,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<TaskName, Entry>,
    /// Names in registration order.
    order: Vec<TaskName>,
}

/// Name → task table, read-mostly after startup.
#[derive(Default)]
pub struct TaskRegistry {
    inner: RwLock<Inner>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.task_names())
            .finish()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a leaf task.
    ///
    /// Fails with [`BuildError::DuplicateTask`] if `name` is taken; the first
    /// registration is kept.
    pub fn register<T>(&self, name: impl Into<TaskName>, task: T) -> Result<()>
    where
        T: Task + 'static,
    {
        self.register_arc(name, Arc::new(task))
    }

    /// Register an already shared leaf task.
    pub fn register_arc(&self, name: impl Into<TaskName>, task: Arc<dyn Task>) -> Result<()> {
        self.insert(name.into(), task, TaskShape::Leaf)
    }

    /// Register a closure-backed leaf task.
    pub fn register_fn<F, Fut>(&self, name: impl Into<TaskName>, f: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register(name, FnTask::new(f))
    }

    /// Register a sequence over already registered children.
    pub fn register_sequence<I, S>(&self, name: impl Into<TaskName>, children: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let name = name.into();
        let names: Vec<TaskName> = children.into_iter().map(Into::into).collect();
        let resolved = self.resolve(&name, &names)?;
        self.insert(
            name,
            Arc::new(Sequence::new(resolved)),
            TaskShape::Sequence(names),
        )
    }

    /// Register a parallel group over already registered children.
    pub fn register_parallel<I, S>(&self, name: impl Into<TaskName>, children: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let name = name.into();
        let names: Vec<TaskName> = children.into_iter().map(Into::into).collect();
        let resolved = self.resolve(&name, &names)?;
        self.insert(
            name,
            Arc::new(Parallel::new(resolved)),
            TaskShape::Parallel(names),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().entries.contains_key(name)
    }

    pub fn shape_of(&self, name: &str) -> Option<TaskShape> {
        self.read().entries.get(name).map(|e| e.shape.clone())
    }

    /// All task names in registration order.
    pub fn task_names(&self) -> Vec<TaskName> {
        self.read().order.clone()
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Task>> {
        self.read()
            .entries
            .get(name)
            .map(|e| Arc::clone(&e.task))
            .ok_or_else(|| BuildError::UnknownTask(name.to_string()))
    }

    /// Run the named task (and, recursively, its children).
    pub async fn run(&self, name: &str) -> Result<()> {
        let task = self.get(name)?;
        run_named(name, task.as_ref()).await
    }

    fn resolve(&self, composite: &str, children: &[TaskName]) -> Result<Vec<NamedTask>> {
        let inner = self.read();
        children
            .iter()
            .map(|child| {
                inner
                    .entries
                    .get(child)
                    .map(|e| NamedTask {
                        name: child.clone(),
                        task: Arc::clone(&e.task),
                    })
                    .ok_or_else(|| {
                        debug!(composite = %composite, child = %child, "unresolved child");
                        BuildError::UnknownTask(child.clone())
                    })
            })
            .collect()
    }

    fn insert(&self, name: TaskName, task: Arc<dyn Task>, shape: TaskShape) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.entries.contains_key(&name) {
            return Err(BuildError::DuplicateTask(name));
        }

        debug!(task = %name, %shape, "registered task");
        inner.order.push(name.clone());
        inner.entries.insert(name, Entry { task, shape });
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
