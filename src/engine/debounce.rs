// src/engine/debounce.rs

//! Trailing-edge debounce per path.
//!
//! Every event for a path pushes that path's deadline to `now + window`;
//! the path is released once its deadline passes without further events.
//! The kind of the latest event wins. A zero window releases events on the
//! next poll.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::engine::ChangeEvent;
use crate::types::ChangeKind;

#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: ChangeKind,
    deadline: Instant,
}

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<String, Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record an event observed at `now`.
    pub fn record(&mut self, event: ChangeEvent, now: Instant) {
        self.pending.insert(
            event.path,
            Pending {
                kind: event.kind,
                deadline: now + self.window,
            },
        );
    }

    /// Earliest deadline among pending paths.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every event whose deadline is `<= now`, sorted by
    /// path.
    pub fn take_due(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        let mut events: Vec<ChangeEvent> = due
            .into_iter()
            .filter_map(|path| {
                self.pending
                    .remove(&path)
                    .map(|p| ChangeEvent::new(path, p.kind))
            })
            .collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }
}
