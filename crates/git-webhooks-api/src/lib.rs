//! # git-webhooks HTTP Service
//!
//! HTTP server that receives git hosting webhooks and starts deployments.
//!
//! - `POST` on any path is dispatched through [`git_webhooks_core::Dispatcher`].
//! - `GET` on any path is answered with 403.
//! - Every other method is answered with 405.

pub mod config;
pub mod errors;

pub use config::{ServiceConfig, ServiceConfigError};
pub use errors::{ServiceError, WebhookHandlerError};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::Response,
    routing::{post, MethodRouter},
    Router,
};
use bytes::Bytes;
use git_webhooks_core::{DeploymentLauncher, Dispatcher, WebhookHeaders};
use std::{any::Any, future::IntoFuture, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    /// Routes requests to deployments
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Resolve the service configuration into a dispatcher.
    pub fn from_config(
        config: &ServiceConfig,
        launcher: Arc<dyn DeploymentLauncher>,
    ) -> Result<Self, ServiceConfigError> {
        let dispatcher = Dispatcher::new(
            config.provider_configs()?,
            config.repository_registry()?,
            launcher,
        );
        Ok(Self::new(dispatcher))
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create the HTTP router.
pub fn create_router(state: AppState, max_body_size: usize) -> Router {
    let webhook: MethodRouter<AppState> = post(handle_webhook).get(handle_get);

    Router::new()
        .route("/", webhook.clone())
        .route("/{*path}", webhook)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(CatchPanicLayer::custom(handle_panic))
                .into_inner(),
        )
        .with_state(state)
}

/// Start the HTTP server and run until SIGINT or SIGTERM.
pub async fn start_server(
    config: ServiceConfig,
    launcher: Arc<dyn DeploymentLauncher>,
) -> Result<(), ServiceError> {
    let state = AppState::from_config(&config, launcher)?;
    info!(
        repositories = state.dispatcher.repositories().len(),
        "Loaded deployment configuration"
    );
    let app = create_router(state, config.server.max_body_size);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let (signalled_tx, mut signalled_rx) = tokio::sync::watch::channel(false);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!(
            "Initiating graceful shutdown with {}s timeout",
            shutdown_timeout.as_secs()
        );
        let _ = signalled_tx.send(true);
    })
    .into_future();

    let deadline = async move {
        let _ = signalled_rx.changed().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => result.map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?,
        _ = deadline => warn!("Graceful shutdown timed out, abandoning in-flight requests"),
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
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

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Dispatch a webhook delivery.
///
/// Answers 200 `OK` as soon as the deployment has been launched; the
/// deployment itself runs in the background.
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, WebhookHandlerError> {
    let webhook_headers: WebhookHeaders = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    state.dispatcher.dispatch(webhook_headers, body)?;
    Ok("OK")
}

/// Reject `GET` requests.
async fn handle_get() -> Response {
    errors::status_response(StatusCode::FORBIDDEN)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    axum::response::IntoResponse::into_response(WebhookHandlerError::InternalError { message })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses an incoming `X-Correlation-ID` or generates one, records it on the
/// span and echoes it on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();
    if status.is_server_error() {
        error!(status = %status, duration_ms = %duration_ms, "Request completed with server error");
    } else if status.is_client_error() {
        warn!(status = %status, duration_ms = %duration_ms, "Request completed with client error");
    } else {
        info!(status = %status, duration_ms = %duration_ms, "Request completed successfully");
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
