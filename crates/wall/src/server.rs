//! HTTP surface: the mail webhook and stored media.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{Method, StatusCode, header};
use axum::routing::any;
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use wall_core::{IngestError, Ingestor, Stage};

use crate::verify::WebhookVerifier;

const RECEIVED: &str = "Received.";
const MUST_USE_POST: &str = "Must use POST.";
const SHUTDOWN_POLL: Duration = Duration::from_secs(5);

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    ingestor: Ingestor,
    verifier: Arc<dyn WebhookVerifier>,
    max_body_bytes: usize,
}

impl AppState {
    /// Creates handler state.
    pub fn new(
        ingestor: Ingestor,
        verifier: Arc<dyn WebhookVerifier>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            ingestor,
            verifier,
            max_body_bytes,
        }
    }
}

/// Builds the router: `/mail` for webhook deliveries, `/images` for media.
pub fn router(state: AppState, media_dir: &Path) -> Router {
    Router::new()
        .route("/mail", any(handle_mail))
        .with_state(Arc::new(state))
        .nest_service("/images", ServeDir::new(media_dir))
        .layer(TraceLayer::new_for_http())
}

/// Receives one webhook delivery.
///
/// Always answers `200 Received.` to a POST, whatever happens to the email,
/// so the relay never retries. Failures are only logged.
async fn handle_mail(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> (StatusCode, &'static str) {
    let method = request.method().clone();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_owned(), |info| info.0.to_string());
    info!(%method, %remote, "Mail webhook");

    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, MUST_USE_POST);
    }

    let headers = request.headers().clone();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let body = match to_bytes(request.into_body(), state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            let error = IngestError::MalformedRequest(format!("unreadable body: {e}"));
            error!(%method, %remote, stage = %Stage::ReceivingEnvelope, %error, "Ingestion aborted");
            return (StatusCode::OK, RECEIVED);
        }
    };

    if let Err(reason) = state.verifier.verify(&headers, &body) {
        warn!(%method, %remote, %reason, "Rejected unverified webhook");
        return (StatusCode::OK, RECEIVED);
    }

    // Run detached so a dropped connection cannot cancel a half-written post.
    let ingestor = state.ingestor.clone();
    let task = tokio::spawn(async move {
        ingestor
            .ingest_request(content_type.as_deref(), &body, Utc::now())
            .await
    });

    match task.await {
        Ok(Ok(_)) => {}
        Ok(Err(aborted)) => {
            error!(%method, %remote, stage = %aborted.stage, error = %aborted.error, "Ingestion aborted");
        }
        Err(e) => error!(%method, %remote, error = %e, "Ingestion task failed"),
    }

    (StatusCode::OK, RECEIVED)
}

/// Serves `app` until SIGINT, SIGTERM or the shutdown file appears.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown_file: Option<PathBuf>,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_file))
    .await
}

async fn shutdown_signal(shutdown_file: Option<PathBuf>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let file = async {
        match shutdown_file {
            Some(path) => wait_for_file(&path).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
        () = file => info!("Shutdown file found, shutting down"),
    }
}

/// Resolves once `path` exists, removing it.
async fn wait_for_file(path: &Path) {
    let mut timer = tokio::time::interval(SHUTDOWN_POLL);
    loop {
        timer.tick().await;
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove shutdown file");
            }
            return;
        }
    }
}
