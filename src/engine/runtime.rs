// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::registry::{TaskRegistry, TaskShape};
use crate::server::livereload::{ReloadSignal, Reloader};
use crate::types::{ChangeKind, ReloadKind, TaskName};
use crate::watch::{BindingSet, ContentCache};

use super::core::{DispatchCore, StartRun};
use super::debounce::Debouncer;
use super::{ChangeEvent, RunOutcome, RunReport};

/// Drops events whose file content did not change since last seen.
struct ContentFilter {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    cache: ContentCache,
}

impl ContentFilter {
    fn keep(&mut self, event: &ChangeEvent) -> bool {
        let path = self.root.join(&event.path);
        if event.kind == ChangeKind::Removed {
            self.cache.forget(&path);
            return true;
        }
        match self.cache.has_changed(self.fs.as_ref(), &path) {
            Ok(changed) => changed,
            Err(err) => {
                // Vanished between the event and the hash; let it through.
                warn!(path = %event.path, "could not hash changed file: {err:#}");
                true
            }
        }
    }
}

/// Async shell around [`DispatchCore`].
///
/// Consumes [`ChangeEvent`]s from a channel, debounces them, runs the
/// bound tasks through the [`TaskRegistry`] and notifies the
/// [`Reloader`] after each task that succeeded. Task failures are logged
/// and reported; they never end the loop.
///
/// [`Dispatcher::run`] returns once the event channel is closed and every
/// pending and in-flight run has completed.
pub struct Dispatcher {
    core: DispatchCore,
    debouncer: Debouncer,
    registry: Arc<TaskRegistry>,
    reloader: Arc<dyn Reloader>,
    events_rx: mpsc::Receiver<ChangeEvent>,
    content: Option<ContentFilter>,
    reports: Option<mpsc::UnboundedSender<RunReport>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("core", &self.core)
            .field("debouncer", &self.debouncer)
            .field("content_hashing", &self.content.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        bindings: BindingSet,
        registry: Arc<TaskRegistry>,
        reloader: Arc<dyn Reloader>,
        events_rx: mpsc::Receiver<ChangeEvent>,
        debounce: Duration,
    ) -> Self {
        Self {
            core: DispatchCore::new(bindings),
            debouncer: Debouncer::new(debounce),
            registry,
            reloader,
            events_rx,
            content: None,
            reports: None,
        }
    }

    /// Send a [`RunReport`] for every completed run to `tx`.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<RunReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Drop create/modify events whose content hash is unchanged. Event
    /// paths are resolved against `root`.
    pub fn with_content_hashing(mut self, fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        self.content = Some(ContentFilter {
            fs,
            root: root.into(),
            cache: ContentCache::new(),
        });
        self
    }

    /// Register an additional binding.
    pub fn bind<I, S>(&mut self, pattern: &str, tasks: I, reload: ReloadKind) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.core.bind(pattern, tasks, reload)
    }

    /// Main loop.
    pub async fn run(mut self) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        self.core.expand_locks(|task| match registry.shape_of(task) {
            Some(TaskShape::Sequence(children) | TaskShape::Parallel(children)) => children,
            Some(TaskShape::Leaf) | None => Vec::new(),
        });
        info!(
            bindings = self.core.binding_count(),
            debounce_ms = self.debouncer.window().as_millis() as u64,
            "watch dispatcher started"
        );

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<RunReport>();
        let mut input_open = true;

        loop {
            if !input_open && self.debouncer.is_empty() && self.core.is_idle() {
                break;
            }

            let deadline = self.debouncer.next_deadline();

            tokio::select! {
                maybe_event = self.events_rx.recv(), if input_open => match maybe_event {
                    Some(event) => {
                        debug!(path = %event.path, kind = ?event.kind, "change received");
                        self.debouncer.record(event, Instant::now());
                    }
                    None => {
                        debug!("change channel closed; draining");
                        input_open = false;
                    }
                },
                Some(report) = done_rx.recv() => {
                    let unblocked = self.core.on_finished(report.binding);
                    self.publish(report);
                    self.spawn_runs(unblocked, &done_tx);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush(&done_tx);
                }
            }
        }

        info!("watch dispatcher stopped");
        Ok(())
    }

    fn flush(&mut self, done_tx: &mpsc::UnboundedSender<RunReport>) {
        for event in self.debouncer.take_due(Instant::now()) {
            if let Some(filter) = self.content.as_mut() {
                if !filter.keep(&event) {
                    debug!(path = %event.path, "content unchanged; ignoring");
                    continue;
                }
            }
            let runs = self.core.on_change(&event);
            self.spawn_runs(runs, done_tx);
        }
    }

    fn spawn_runs(&self, runs: Vec<StartRun>, done_tx: &mpsc::UnboundedSender<RunReport>) {
        for run in runs {
            info!(
                binding = run.binding,
                path = %run.path,
                tasks = ?run.tasks,
                "watch triggered"
            );

            let registry = Arc::clone(&self.registry);
            let reloader = Arc::clone(&self.reloader);
            let done_tx = done_tx.clone();

            tokio::spawn(async move {
                let binding = run.binding;
                let path = run.path.clone();
                let tasks = run.tasks.clone();

                let outcome = match tokio::spawn(execute_run(registry, reloader, run)).await {
                    Ok(outcome) => outcome,
                    Err(join_err) => {
                        error!(binding, path = %path, "watch run panicked: {join_err}");
                        RunOutcome::Failed {
                            task: tasks.join(", "),
                            error: format!("run panicked: {join_err}"),
                        }
                    }
                };

                // The dispatcher only goes away after every run reported.
                let _ = done_tx.send(RunReport {
                    binding,
                    path,
                    tasks,
                    outcome,
                });
            });
        }
    }

    fn publish(&self, report: RunReport) {
        if let RunOutcome::Failed { task, .. } = &report.outcome {
            warn!(
                binding = report.binding,
                path = %report.path,
                task = %task,
                "watch run failed; still watching"
            );
        }
        if let Some(tx) = &self.reports {
            let _ = tx.send(report);
        }
    }
}

/// Run a binding's tasks in order, signalling a reload after each success.
async fn execute_run(
    registry: Arc<TaskRegistry>,
    reloader: Arc<dyn Reloader>,
    run: StartRun,
) -> RunOutcome {
    for task in &run.tasks {
        match registry.run(task).await {
            Ok(()) => {
                if let Some(signal) = ReloadSignal::for_kind(run.reload, &run.path) {
                    reloader.reload(signal);
                }
            }
            Err(err) => {
                error!(
                    binding = run.binding,
                    task = %task,
                    path = %run.path,
                    "{err}"
                );
                return RunOutcome::Failed {
                    task: task.clone(),
                    error: err.to_string(),
                };
            }
        }
    }
    RunOutcome::Succeeded
}
