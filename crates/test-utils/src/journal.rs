//! Recording tasks for registry and dispatcher tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetdag::errors::BuildError;
use assetdag::registry::{Task, TaskFuture};

#[derive(Debug, Default)]
struct State {
    entries: Vec<String>,
    running: HashMap<String, usize>,
    max_running: HashMap<String, usize>,
}

/// Shared log of task starts and ends.
///
/// Entries read `start:<name>` and `end:<name>`. The journal also tracks
/// how many instances of each task were running at once.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    state: Arc<Mutex<State>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A task that records itself, sleeps for `delay`, then succeeds.
    pub fn task(&self, name: &str, delay: Duration) -> JournalTask {
        JournalTask {
            journal: self.clone(),
            name: name.to_string(),
            delay,
            failure: None,
        }
    }

    /// Like [`Journal::task`], but fails with a transform error.
    pub fn failing_task(&self, name: &str, delay: Duration, message: &str) -> JournalTask {
        JournalTask {
            failure: Some(message.to_string()),
            ..self.task(name, delay)
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().entries.clone()
    }

    /// Number of times `name` started.
    pub fn starts(&self, name: &str) -> usize {
        let needle = format!("start:{name}");
        self.lock().entries.iter().filter(|e| **e == needle).count()
    }

    /// Index of the first occurrence of `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.lock().entries.iter().position(|e| e == entry)
    }

    /// Highest number of concurrently running instances of `name`.
    pub fn max_concurrent(&self, name: &str) -> usize {
        self.lock().max_running.get(name).copied().unwrap_or(0)
    }

    fn started(&self, name: &str) {
        let mut state = self.lock();
        state.entries.push(format!("start:{name}"));
        let running = {
            let r = state.running.entry(name.to_string()).or_insert(0);
            *r += 1;
            *r
        };
        let max = state.max_running.entry(name.to_string()).or_insert(0);
        *max = (*max).max(running);
    }

    fn ended(&self, name: &str) {
        let mut state = self.lock();
        state.entries.push(format!("end:{name}"));
        if let Some(r) = state.running.get_mut(name) {
            *r = r.saturating_sub(1);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Task produced by a [`Journal`].
#[derive(Debug, Clone)]
pub struct JournalTask {
    journal: Journal,
    name: String,
    delay: Duration,
    failure: Option<String>,
}

impl Task for JournalTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            self.journal.started(&self.name);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.journal.ended(&self.name);

            match &self.failure {
                Some(message) => Err(BuildError::transform(
                    &self.name,
                    format!("{}.src", self.name),
                    message.clone(),
                )),
                None => Ok(()),
            }
        })
    }
}
