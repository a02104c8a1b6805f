// src/server/mod.rs

//! Development server.
//!
//! Serves the destination directory over HTTP, injects the live-reload
//! client into HTML pages and pushes [`ReloadSignal`]s to browsers over a
//! WebSocket.

pub mod livereload;

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::registry::{Task, TaskFuture};

pub use livereload::{LiveReload, ReloadSignal, Reloader};

pub const LIVERELOAD_PATH: &str = "/__assetdag/livereload";
pub const CLIENT_SCRIPT_PATH: &str = "/__assetdag/livereload.js";

const CLIENT_SCRIPT: &str = r#"(function () {
  var proto = location.protocol === "https:" ? "wss://" : "ws://";
  var socket = new WebSocket(proto + location.host + "/__assetdag/livereload");
  socket.onmessage = function (event) {
    var msg = JSON.parse(event.data);
    if (msg.type === "inject") {
      var links = document.querySelectorAll('link[rel="stylesheet"]');
      for (var i = 0; i < links.length; i++) {
        var href = links[i].href.replace(/[?&]assetdag=\d+/, "");
        links[i].href = href + (href.indexOf("?") < 0 ? "?" : "&") + "assetdag=" + Date.now();
      }
    } else {
      location.reload();
    }
  };
})();
"#;

#[derive(Clone)]
struct ServerState {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    live: LiveReload,
}

/// Static file server for the build output.
#[derive(Clone)]
pub struct DevServer {
    host: String,
    port: u16,
    state: ServerState,
}

impl std::fmt::Debug for DevServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("root", &self.state.root)
            .finish_non_exhaustive()
    }
}

impl DevServer {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        live: LiveReload,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            state: ServerState {
                root: root.into(),
                fs,
                live,
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(LIVERELOAD_PATH, get(livereload_ws))
            .route(CLIENT_SCRIPT_PATH, get(client_script))
            .fallback(serve_static)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process is interrupted.
    pub async fn serve(&self) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        let addr: SocketAddr = listener.local_addr()?;
        info!(%addr, root = %self.state.root.display(), "dev server listening on http://{addr}");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| BuildError::Other(anyhow::Error::new(e).context("dev server failed")))
    }
}

/// The `server` task: runs the dev server forever.
#[derive(Debug, Clone)]
pub struct ServerTask {
    server: DevServer,
}

impl ServerTask {
    pub fn new(server: DevServer) -> Self {
        Self { server }
    }
}

impl Task for ServerTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(self.server.serve())
    }
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

async fn livereload_ws(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    let rx = state.live.subscribe();
    ws.on_upgrade(move |socket| handle_client(socket, rx))
}

async fn handle_client(mut socket: WebSocket, mut rx: broadcast::Receiver<ReloadSignal>) {
    debug!("live-reload client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            signal = rx.recv() => match signal {
                Ok(signal) => {
                    let Ok(json) = serde_json::to_string(&signal) else {
                        continue;
                    };
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "live-reload client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    debug!("live-reload client disconnected");
}

async fn serve_static(State(state): State<ServerState>, uri: Uri) -> Response {
    let Some(path) = resolve_request_path(&state.root, uri.path()) else {
        warn!(path = %uri.path(), "rejected request path");
        return StatusCode::BAD_REQUEST.into_response();
    };

    let path = if state.fs.is_dir(&path) {
        path.join("index.html")
    } else {
        path
    };

    if !state.fs.is_file(&path) {
        debug!(path = %uri.path(), "not found");
        return StatusCode::NOT_FOUND.into_response();
    }

    let fs = Arc::clone(&state.fs);
    let read_path = path.clone();
    let bytes = match tokio::task::spawn_blocking(move || fs.read(&read_path)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(err)) => {
            warn!(path = %path.display(), "read failed: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(err) => {
            warn!(path = %path.display(), "read task failed: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = content_type_for(&path);
    let body = if content_type.starts_with("text/html") {
        inject_client(&String::from_utf8_lossy(&bytes)).into_bytes()
    } else {
        bytes
    };

    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// Map a request path onto a file below `root`.
///
/// Returns `None` for paths that try to leave `root`.
pub fn resolve_request_path(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(uri_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Insert the live-reload client script before `</body>`, or append it when
/// the page has no body tag.
pub fn inject_client(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_SCRIPT_PATH}"></script>"#);
    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}
