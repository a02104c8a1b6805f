// src/registry/composite.rs

//! Sequence and parallel composition of registered tasks.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::errors::{BuildError, Result};
use crate::registry::task::{Task, TaskFuture};
use crate::types::TaskName;

/// A child reference resolved at registration time.
#[derive(Clone)]
pub(crate) struct NamedTask {
    pub name: TaskName,
    pub task: Arc<dyn Task>,
}

/// Run a task and log its lifecycle (`starting` / `finished` / `failed`).
pub(crate) async fn run_named(name: &str, task: &dyn Task) -> Result<()> {
    let started = Instant::now();
    info!(task = %name, "starting");

    match task.run().await {
        Ok(()) => {
            info!(
                task = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "finished"
            );
            Ok(())
        }
        Err(err) => {
            error!(
                task = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "failed"
            );
            Err(err)
        }
    }
}

/// Runs children strictly one after another.
///
/// The first failing child stops the sequence; later children are never
/// invoked and the child's error is returned unchanged.
pub struct Sequence {
    children: Vec<NamedTask>,
}

impl Sequence {
    pub(crate) fn new(children: Vec<NamedTask>) -> Self {
        Self { children }
    }
}

impl Task for Sequence {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            for child in &self.children {
                run_named(&child.name, child.task.as_ref()).await?;
            }
            Ok(())
        })
    }
}

/// Starts all children concurrently and joins them.
///
/// Siblings are never cancelled: every child runs to completion, then the
/// first failure in start order (if any) is reported.
pub struct Parallel {
    children: Vec<NamedTask>,
}

impl Parallel {
    pub(crate) fn new(children: Vec<NamedTask>) -> Self {
        Self { children }
    }
}

impl Task for Parallel {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            let handles: Vec<_> = self
                .children
                .iter()
                .map(|child| {
                    let child = child.clone();
                    tokio::spawn(async move { run_named(&child.name, child.task.as_ref()).await })
                })
                .collect();

            let mut first_failure: Option<BuildError> = None;

            for (child, handle) in self.children.iter().zip(handles) {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(BuildError::Other(
                        anyhow::Error::new(join_err)
                            .context(format!("task '{}' panicked", child.name)),
                    )),
                };

                if let Err(err) = result {
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    } else {
                        debug!(
                            task = %child.name,
                            error = %err,
                            "additional failure in parallel group"
                        );
                    }
                }
            }

            match first_failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }
}
