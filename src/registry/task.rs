// src/registry/task.rs

//! The unit of work held by the registry.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::TaskName;

/// Boxed future returned by [`Task::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A named, idempotent, asynchronous build step.
///
/// Leaf tasks do filesystem work; composites ([`super::Sequence`],
/// [`super::Parallel`]) only order other tasks. Implementations must be
/// callable any number of times.
pub trait Task: Send + Sync {
    fn run(&self) -> TaskFuture<'_>;
}

/// Leaf task backed by a closure returning a future.
///
/// ```ignore
/// registry.register("hello", FnTask::new(|| async { Ok(()) }))?;
/// ```
pub struct FnTask<F> {
    f: F,
}

impl<F> FnTask<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Task for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self) -> TaskFuture<'_> {
        Box::pin((self.f)())
    }
}

/// How a registered task is defined, for dry-run output and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskShape {
    Leaf,
    Sequence(Vec<TaskName>),
    Parallel(Vec<TaskName>),
}

impl fmt::Display for TaskShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskShape::Leaf => write!(f, "leaf"),
            TaskShape::Sequence(children) => write!(f, "sequence({})", children.join(", ")),
            TaskShape::Parallel(children) => write!(f, "parallel({})", children.join(", ")),
        }
    }
}
