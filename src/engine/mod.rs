// src/engine/mod.rs

//! Watch dispatcher.
//!
//! Change events flow through a single channel into one dispatcher loop:
//!
//! ```text
//! notify / tests ──ChangeEvent──▶ Debouncer ──▶ DispatchCore ──StartRun──▶ spawned run
//!                                                    ▲                          │
//!                                                    └────────RunReport─────────┘
//! ```
//!
//! - [`debounce`] holds the trailing-edge, per-path debounce window.
//! - [`core`] is the pure state machine deciding which bindings fire, and
//!   guaranteeing that a task never runs twice at the same time.
//! - [`runtime`] is the async shell: it owns the channels, runs tasks
//!   through the registry and notifies the reload collaborator.

use crate::types::{ChangeKind, TaskName};

/// A filesystem change, with a `/`-separated path relative to the project
/// root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::Modified)
    }
}

/// Outcome of one watch-triggered run of a binding's tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed { task: TaskName, error: String },
}

/// Report emitted after every watch-triggered run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Index of the binding that fired.
    pub binding: usize,
    /// Changed path that triggered (or last re-triggered) the run.
    pub path: String,
    pub tasks: Vec<TaskName>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Succeeded
    }
}

pub mod core;
pub mod debounce;
pub mod runtime;

pub use core::{DispatchCore, StartRun};
pub use debounce::Debouncer;
pub use runtime::Dispatcher;
