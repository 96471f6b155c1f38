//! Local HTTP server handing the packaged archive to a device on the same network
//!
//! Routes:
//! - `GET /` a small page linking to the archive
//! - `GET /download` the archive itself, or 404 while it does not exist

use crate::error::{Error, Result};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct ServerState {
    archive_path: Arc<PathBuf>,
    archive_name: Arc<String>,
}

/// Create the router serving `archive_path`
pub fn create_router(archive_path: PathBuf) -> Router {
    let archive_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive.zip".to_string());
    let state = ServerState {
        archive_path: Arc::new(archive_path),
        archive_name: Arc::new(archive_name),
    };

    Router::new()
        .route("/", get(index))
        .route("/download", get(download))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn index(State(state): State<ServerState>) -> Html<String> {
    let name = escape_html(&state.archive_name);
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{name}</title></head>\n<body>\n<h1>Your music is ready</h1>\n\
         <p><a href=\"/download\" download=\"{name}\">Download {name}</a></p>\n</body>\n</html>\n"
    ))
}

async fn download(State(state): State<ServerState>) -> Response {
    let file = match tokio::fs::File::open(state.archive_path.as_path()).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return (StatusCode::NOT_FOUND, "archive not found").into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to open archive");
            return (StatusCode::INTERNAL_SERVER_ERROR, "archive unavailable").into_response();
        }
    };

    let mut headers = vec![(header::CONTENT_TYPE, "application/zip".to_string())];
    headers.push((
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", state.archive_name.replace('"', "")),
    ));
    if let Ok(meta) = file.metadata().await {
        headers.push((header::CONTENT_LENGTH, meta.len().to_string()));
    }

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    for (name, value) in headers {
        if let Ok(value) = value.parse() {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

/// Address of this host on the local network, if one can be determined
///
/// Connecting a UDP socket sends no packets; it only makes the OS pick the outbound
/// interface.
pub fn lan_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
    socket.connect(("8.8.8.8", 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// Serves one archive until cancelled
pub struct LocalServer {
    bind_address: SocketAddr,
    archive_path: PathBuf,
}

impl LocalServer {
    /// Create a server for `archive_path` on `bind_address`
    pub fn new(bind_address: SocketAddr, archive_path: PathBuf) -> Self {
        Self {
            bind_address,
            archive_path,
        }
    }

    /// Bind and serve until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(self.bind_address)
            .await
            .map_err(|e| Error::Server(format!("failed to bind {}: {e}", self.bind_address)))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve_on(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let local = listener.local_addr()?;
        match lan_address() {
            Some(ip) => tracing::info!(
                url = %format!("http://{}:{}", ip, local.port()),
                "open this address on your device to download the archive"
            ),
            None => tracing::info!(address = %local, "archive server listening"),
        }

        let app = create_router(self.archive_path);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        tracing::info!("archive server stopped");
        Ok(())
    }
}
