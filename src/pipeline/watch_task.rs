// src/pipeline/watch_task.rs

use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::engine::{ChangeEvent, Dispatcher};
use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::registry::{Task, TaskFuture, TaskRegistry};
use crate::server::LiveReload;
use crate::watch::{spawn_watcher, BindingSet};

/// The `watch` task: watches the source tree and runs the dispatcher until
/// the process is interrupted.
///
/// Holds the registry weakly, since the registry owns this task.
#[derive(Debug, Clone)]
pub struct WatchTask {
    registry: Weak<TaskRegistry>,
    bindings: BindingSet,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    src_dir: PathBuf,
    dist_dir: PathBuf,
    debounce: Duration,
    use_hash: bool,
    live: LiveReload,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub debounce: Duration,
    pub use_hash: bool,
}

impl WatchTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Weak<TaskRegistry>,
        bindings: BindingSet,
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        src_dir: impl Into<PathBuf>,
        dist_dir: impl Into<PathBuf>,
        options: WatchOptions,
        live: LiveReload,
    ) -> Self {
        Self {
            registry,
            bindings,
            fs,
            root: root.into(),
            src_dir: src_dir.into(),
            dist_dir: dist_dir.into(),
            debounce: options.debounce,
            use_hash: options.use_hash,
            live,
        }
    }

    async fn execute(&self) -> Result<()> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| BuildError::Other(anyhow::anyhow!("task registry was dropped")))?;

        let (tx, rx) = mpsc::channel::<ChangeEvent>(256);
        let _watcher = spawn_watcher(
            self.root.clone(),
            self.src_dir.clone(),
            vec![self.dist_dir.clone()],
            tx,
        )?;
        info!(src = %self.src_dir.display(), bindings = self.bindings.len(), "watching for changes");

        let mut dispatcher = Dispatcher::new(
            self.bindings.clone(),
            registry,
            Arc::new(self.live.clone()),
            rx,
            self.debounce,
        );
        if self.use_hash {
            dispatcher = dispatcher.with_content_hashing(Arc::clone(&self.fs), self.root.clone());
        }

        dispatcher.run().await
    }
}

impl Task for WatchTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(self.execute())
    }
}
