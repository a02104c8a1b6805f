// src/server/livereload.rs

//! Live-reload hub.
//!
//! The watch dispatcher talks to a [`Reloader`]; the dev server's
//! WebSocket clients subscribe to the [`LiveReload`] broadcast and receive
//! each [`ReloadSignal`] as JSON.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::types::ReloadKind;

/// Message pushed to connected browsers.
///
/// Serialises to `{"type":"reload"}` or `{"type":"inject","path":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadSignal {
    #[serde(rename = "reload")]
    Full,
    Inject { path: String },
}

impl ReloadSignal {
    /// Signal for a binding's reload kind, or `None` when clients should not
    /// be notified.
    pub fn for_kind(kind: ReloadKind, path: &str) -> Option<Self> {
        match kind {
            ReloadKind::Full => Some(ReloadSignal::Full),
            ReloadKind::Inject => Some(ReloadSignal::Inject {
                path: path.to_string(),
            }),
            ReloadKind::None => None,
        }
    }
}

/// Receiver of reload notifications.
pub trait Reloader: Send + Sync {
    fn reload(&self, signal: ReloadSignal);
}

/// Broadcast fan-out to every connected live-reload client.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Reloader for LiveReload {
    fn reload(&self, signal: ReloadSignal) {
        // No receivers simply means no browser is connected yet.
        match self.tx.send(signal.clone()) {
            Ok(clients) => info!(?signal, clients, "reload signal sent"),
            Err(_) => debug!(?signal, "no live-reload clients connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_serialise_to_the_client_protocol() {
        assert_eq!(
            serde_json::to_string(&ReloadSignal::Full).unwrap(),
            r#"{"type":"reload"}"#
        );
        assert_eq!(
            serde_json::to_string(&ReloadSignal::Inject {
                path: "src/styles/main.scss".into()
            })
            .unwrap(),
            r#"{"type":"inject","path":"src/styles/main.scss"}"#
        );
    }

    #[test]
    fn reload_kind_maps_to_signal() {
        assert_eq!(ReloadSignal::for_kind(ReloadKind::Full, "a"), Some(ReloadSignal::Full));
        assert_eq!(
            ReloadSignal::for_kind(ReloadKind::Inject, "a.scss"),
            Some(ReloadSignal::Inject { path: "a.scss".into() })
        );
        assert_eq!(ReloadSignal::for_kind(ReloadKind::None, "a"), None);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_signal() {
        let hub = LiveReload::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.client_count(), 2);

        hub.reload(ReloadSignal::Full);

        assert_eq!(a.recv().await.unwrap(), ReloadSignal::Full);
        assert_eq!(b.recv().await.unwrap(), ReloadSignal::Full);
    }

    #[test]
    fn reload_without_clients_is_fine() {
        LiveReload::new().reload(ReloadSignal::Full);
    }
}
