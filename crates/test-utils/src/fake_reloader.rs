use std::sync::{Arc, Mutex};

use assetdag::server::{ReloadSignal, Reloader};

/// Reloader that records every signal instead of talking to browsers.
#[derive(Debug, Clone, Default)]
pub struct FakeReloader {
    signals: Arc<Mutex<Vec<ReloadSignal>>>,
}

impl FakeReloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<ReloadSignal> {
        self.signals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Reloader for FakeReloader {
    fn reload(&self, signal: ReloadSignal) {
        self.signals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(signal);
    }
}
