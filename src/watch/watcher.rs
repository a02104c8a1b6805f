// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::ChangeEvent;
use crate::types::ChangeKind;
use crate::watch::path_utils::relative_str;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching, which in turn closes the change-event channel.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `watch_dir` recursively and forward changes as [`ChangeEvent`]s
/// whose paths are relative to `root`.
///
/// Paths under any of `ignore` (typically the destination directory) are
/// dropped so that build output never re-triggers the build.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    watch_dir: impl Into<PathBuf>,
    ignore: Vec<PathBuf>,
    change_tx: mpsc::Sender<ChangeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);
    let watch_dir = watch_dir.into();
    let ignore: Vec<PathBuf> = ignore
        .into_iter()
        .map(|dir| dir.canonicalize().unwrap_or(dir))
        .collect();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("assetdag: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetdag: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&watch_dir, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", watch_dir);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            for path in event.paths.iter() {
                let Some(change) = to_change_event(&root, &ignore, event.kind, path) else {
                    continue;
                };
                if change_tx.send(change).await.is_err() {
                    debug!("dispatcher gone; stopping watcher forwarding");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

fn to_change_event(
    root: &Path,
    ignore: &[PathBuf],
    kind: EventKind,
    path: &Path,
) -> Option<ChangeEvent> {
    if ignore.iter().any(|dir| path.starts_with(dir)) {
        return None;
    }

    let kind = match kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        // Renames arrive as modifications of both the old and the new path.
        EventKind::Modify(_) | EventKind::Any if !path.exists() => ChangeKind::Removed,
        EventKind::Modify(_) | EventKind::Any => ChangeKind::Modified,
        EventKind::Access(_) | EventKind::Other => return None,
    };

    if path.is_dir() && kind != ChangeKind::Removed {
        return None;
    }

    match relative_str(root, path) {
        Some(rel) => Some(ChangeEvent::new(rel, kind)),
        None => {
            warn!("could not relativize path {:?} against root {:?}", path, root);
            None
        }
    }
}
