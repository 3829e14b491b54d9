//! Live preview of a document in the browser.
//!
//! The page is served at `/` and keeps a WebSocket open on the same path.
//! Every delivery of the file watcher goes through the [`Viewer`] and the
//! outcome is pushed to all connected pages. Files next to the document are
//! served under `/doc/`, stylesheets under `/themes/`.

pub mod assets;
pub mod protocol;
pub mod themes;

use crate::assets::Assets;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::themes::ThemeCatalog;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, Path as UrlPath};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use markview_config::Settings;
use markview_core::{
    Delivery, Direction, RenderedDocument, SearchOptions, ViewUpdate, Viewer, Viewport,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{watch, RwLock};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

/// URL path the document directory is served under.
pub const DOC_BASE: &str = "/doc/";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    /// 0 picks a free port.
    pub port: u16,
    pub open_browser: bool,
    /// Allow plugin content such as `<object>` and `<embed>`.
    pub plugins: bool,
    /// Initial stylesheet name.
    pub style: String,
    pub stylesheet_dir: Option<PathBuf>,
}

impl ServerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            open_browser: settings.server.open_browser,
            plugins: settings.plugins,
            style: settings.style.clone(),
            stylesheet_dir: settings.stylesheet_dir(),
        }
    }
}

/// What a page needs to catch up with the viewer.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    document: Option<Arc<RenderedDocument>>,
    error: Option<String>,
}

struct AppState {
    viewer: RwLock<Viewer>,
    snapshots: watch::Sender<Snapshot>,
    themes: ThemeCatalog,
    active_style: RwLock<String>,
    title: String,
    base_dir: PathBuf,
    plugins: bool,
}

impl AppState {
    fn new(viewer: Viewer, options: &ServerOptions) -> Self {
        let themes = ThemeCatalog::discover(options.stylesheet_dir.as_deref());
        let active_style = themes.initial(&options.style);
        let (snapshots, _) = watch::channel(Snapshot::default());

        Self {
            title: viewer.title(),
            base_dir: viewer.base_dir().to_path_buf(),
            viewer: RwLock::new(viewer),
            snapshots,
            themes,
            active_style: RwLock::new(active_style),
            plugins: options.plugins,
        }
    }

    async fn apply(&self, delivery: Delivery) {
        let mut viewer = self.viewer.write().await;

        match viewer.apply(delivery) {
            ViewUpdate::Document(document) => {
                tracing::debug!(revision = document.revision, "Displaying new revision");
            }
            ViewUpdate::Error { message } => {
                tracing::warn!(%message, "Displaying error");
            }
        }

        self.snapshots.send_replace(Snapshot {
            document: viewer.document().cloned(),
            error: viewer.error().map(ToOwned::to_owned),
        });
    }

    fn style_message(&self, name: &str) -> ServerMessage {
        ServerMessage::Style {
            name: name.to_string(),
            href: themes::href(name),
        }
    }

    async fn handle_client_message(&self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Viewport {
                scroll_y,
                content_height,
            } => {
                self.viewer.write().await.report_viewport(Viewport {
                    scroll_y,
                    content_height,
                });
                None
            }
            ClientMessage::Rendered { content_height } => {
                let y = self.viewer.write().await.rendered(content_height)?;
                Some(ServerMessage::Scroll { y })
            }
            ClientMessage::Find {
                query,
                case_sensitive,
                wrap,
                highlight_all,
                backwards,
            } => {
                let options = SearchOptions {
                    case_sensitive,
                    wrap,
                    highlight_all,
                };
                let direction = if backwards {
                    Direction::Backward
                } else {
                    Direction::Forward
                };
                let hit = self.viewer.write().await.find(&query, options, direction);
                Some(ServerMessage::Search { query, hit })
            }
            ClientMessage::SelectStyle { name } => {
                if !self.themes.contains(&name) {
                    tracing::warn!(name, "Unknown stylesheet requested");
                    return None;
                }
                *self.active_style.write().await = name.clone();
                Some(self.style_message(&name))
            }
        }
    }
}

type SharedState = Arc<AppState>;

/// Serves the page, or upgrades to the WebSocket when asked to.
async fn index_handler(
    ws: Option<WebSocketUpgrade>,
    Extension(state): Extension<SharedState>,
) -> Response {
    if let Some(ws) = ws {
        return ws.on_upgrade(|ws| async move { handle_websocket(ws, state).await });
    }

    let style = state.active_style.read().await.clone();
    let html = Assets::build_html(&state.title, &themes::href(&style));

    let mut response = (StatusCode::OK, Html(html)).into_response();
    if !state.plugins {
        response.headers_mut().insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("object-src 'none'"),
        );
    }
    response
}

async fn theme_handler(
    UrlPath(name): UrlPath<String>,
    Extension(state): Extension<SharedState>,
) -> Response {
    let Some(theme) = state.themes.get(&name) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match theme.load().await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(err) => {
            tracing::error!(?err, name, "Failed to load stylesheet");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Messages already sent on one connection.
#[derive(Default)]
struct Sent {
    revision: Option<u64>,
    error: Option<String>,
}

fn snapshot_messages(state: &AppState, snapshot: &Snapshot, sent: &mut Sent) -> Vec<ServerMessage> {
    let mut messages = Vec::new();

    if let Some(document) = &snapshot.document {
        if sent.revision != Some(document.revision) {
            sent.revision = Some(document.revision);
            messages.push(ServerMessage::update(document, &state.title, DOC_BASE));
        }
    }

    if sent.error != snapshot.error {
        sent.error = snapshot.error.clone();
        messages.push(ServerMessage::Error {
            message: snapshot.error.clone(),
        });
    }

    messages
}

async fn send_message<S>(sender: &mut S, msg: &ServerMessage) -> bool
where
    S: futures::Sink<WsMessage> + Unpin,
{
    let text = match serde_json::to_string(msg) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(?err, "Failed to serialize message");
            return true;
        }
    };
    sender.send(WsMessage::Text(text)).await.is_ok()
}

async fn handle_websocket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();
    let mut snapshots = state.snapshots.subscribe();
    let mut sent = Sent::default();

    let active_style = state.active_style.read().await.clone();
    let mut greeting = vec![
        ServerMessage::Themes {
            themes: state.themes.infos(),
            active: active_style.clone(),
        },
        state.style_message(&active_style),
    ];
    let snapshot = snapshots.borrow_and_update().clone();
    greeting.extend(snapshot_messages(&state, &snapshot, &mut sent));

    for msg in &greeting {
        if !send_message(&mut sender, msg).await {
            return;
        }
    }

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let mut alive = true;
                for msg in snapshot_messages(&state, &snapshot, &mut sent) {
                    alive = send_message(&mut sender, &msg).await;
                    if !alive {
                        break;
                    }
                }
                if !alive {
                    break;
                }
            }
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => msg,
                    Err(err) => {
                        tracing::warn!(?err, text, "Invalid message from page");
                        continue;
                    }
                };
                if let Some(reply) = state.handle_client_message(msg).await {
                    if !send_message(&mut sender, &reply).await {
                        break;
                    }
                }
            }
        }
    }

    let _ = sender.send(WsMessage::Close(None)).await;
    tracing::debug!("WebSocket connection closed");
}

fn router(state: SharedState) -> Router {
    let documents = ServeDir::new(&state.base_dir);

    Router::new()
        .route("/", get(index_handler))
        .route("/themes/:name", get(theme_handler))
        .nest_service(DOC_BASE.trim_end_matches('/'), documents)
        .layer(Extension(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
}

/// The bound but not yet running preview server.
pub struct PreviewServer {
    listener: TcpListener,
    state: SharedState,
    open_browser: bool,
}

impl PreviewServer {
    pub async fn bind(viewer: Viewer, options: &ServerOptions) -> Result<Self, ServerError> {
        let addr = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            state: Arc::new(AppState::new(viewer, options)),
            open_browser: options.open_browser,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn url(&self) -> Result<String, ServerError> {
        Ok(format!("http://{}", self.local_addr()?))
    }

    /// Feeds `deliveries` to the viewer and serves the page until the
    /// listener fails.
    pub async fn run(self, mut deliveries: UnboundedReceiver<Delivery>) -> Result<(), ServerError> {
        let url = self.url()?;

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(delivery) = deliveries.recv().await {
                state.apply(delivery).await;
            }
            tracing::debug!("File watcher finished delivering");
        });

        if self.open_browser {
            if let Err(err) = webbrowser::open(&url) {
                tracing::error!(?err, url, "Failed to open the browser");
            }
        }

        tracing::info!(url, "Serving preview");

        axum::serve(
            self.listener,
            router(self.state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}
