//! Web server entrypoints live here.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderMap, HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::Settings;
use crate::models::{ErrorResponse, HealthResponse};
use crate::state::AppState;

const HEALTHZ_PATH: &str = "/v1/healthz";
const STATS_PATH: &str = "/v1/stats";
const HEALTH_STATUS: &str = "ok";
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_ID_HEADER: &str = "x-request-id";
const ERROR_NOT_FOUND: &str = "NOT_FOUND";
const ERROR_METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub type SharedState = Arc<AppState>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ShutdownEvent {
    Pending,
    CtrlC,
    SigTerm,
    ListenerFailed,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("listen host may not be empty")]
    EmptyHost,
    #[error("invalid listen address `{address}`: {source}")]
    InvalidListenAddr {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to determine local address: {source}")]
    LocalAddr {
        #[source]
        source: std::io::Error,
    },
    #[error("axum server error: {source}")]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

pub fn build_api_router(state: SharedState) -> Router {
    debug_assert!(HEALTHZ_PATH.starts_with("/v1/"));
    debug_assert!(STATS_PATH.starts_with("/v1/"));

    Router::new()
        .route(
            HEALTHZ_PATH,
            get(healthz).fallback(method_not_allowed_handler),
        )
        .route(STATS_PATH, get(stats).fallback(method_not_allowed_handler))
        .layer(Extension(state))
}

/// Full application router: API routes plus CORS, request tracing, and
/// request-id propagation. CORS is deliberately wide open for now; the
/// service has no credentialed surface to protect yet.
pub fn build_app_router(state: SharedState) -> Router {
    debug_assert_eq!(HEALTH_STATUS, "ok");

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let path = matched_path_or_uri(request);
            let request_id =
                header_request_id(request.headers()).unwrap_or_else(|| "-".to_string());
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                path = %path,
                request_id = %request_id
            )
        })
        .on_response(
            |response: &Response, latency: Duration, span: &tracing::Span| {
                let status = response.status().as_u16();
                let latency_ms = latency.as_millis().min(u128::from(u64::MAX)) as u64;
                tracing::info!(parent: span, status, latency_ms, "request completed");
            },
        );

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .merge(build_api_router(state))
        .fallback(not_found_handler)
        .layer(cors_layer)
        .layer(trace_layer);

    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    router
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid::default(),
        ))
}

/// Binds `settings.host:settings.port` and serves until Ctrl-C or SIGTERM,
/// then drains in-flight connections for up to [`DRAIN_TIMEOUT`].
pub async fn serve(settings: &Settings, state: SharedState) -> Result<(), ServerError> {
    let listen_addr = resolve_listen_addr(settings)?;

    let listener = bind_listener(listen_addr).await?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::LocalAddr { source })?;
    tracing::info!(%local_addr, version = SERVICE_VERSION, "glyphic server listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(ShutdownEvent::Pending);

    let shutdown_future = broadcast_shutdown(shutdown_tx);

    let app = build_app_router(state);

    let mut server_future = Box::pin(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_future)
            .await
    });

    let drain_rx = shutdown_rx.clone();
    let mut drain_timeout = Box::pin(drain_timeout_future(drain_rx));

    tokio::select! {
        result = server_future.as_mut() => {
            if let Err(source) = result {
                return Err(ServerError::Serve { source });
            }
        }
        _ = drain_timeout.as_mut() => {
            // Timeout elapsed; dropping the server future forces termination.
        }
    }

    let final_event = *shutdown_rx.borrow();
    if final_event == ShutdownEvent::Pending {
        tracing::info!("server stopped without external shutdown signal");
    } else {
        tracing::info!(?final_event, "server shutdown complete");
    }

    Ok(())
}

async fn healthz(Extension(state): Extension<SharedState>) -> Json<HealthResponse> {
    debug_assert_eq!(HEALTH_STATUS, "ok");
    Json(HealthResponse::new(
        HEALTH_STATUS,
        SERVICE_VERSION,
        state.model_loaded(),
    ))
}

async fn stats(Extension(state): Extension<SharedState>) -> Response {
    Json(state.stats()).into_response()
}

async fn not_found_handler(request: Request<Body>) -> Response {
    debug_assert!(request.uri().path().starts_with('/'));
    let path = request.uri().path().to_string();
    let request_id = header_request_id(request.headers());
    error_body(
        StatusCode::NOT_FOUND,
        ERROR_NOT_FOUND,
        format!("resource `{path}` not found"),
        request_id,
    )
}

async fn method_not_allowed_handler(request: Request<Body>) -> Response {
    debug_assert!(request.uri().path().starts_with('/'));
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = header_request_id(request.headers());
    error_body(
        StatusCode::METHOD_NOT_ALLOWED,
        ERROR_METHOD_NOT_ALLOWED,
        format!("method `{method}` not allowed for `{path}`"),
        request_id,
    )
}

/// Renders a framework-level failure (routing, method mismatch) in the same
/// `ErrorResponse` shape the service taxonomy uses, echoing the request id
/// under `details` when one is present.
fn error_body(
    status: StatusCode,
    error_code: &str,
    message: String,
    request_id: Option<String>,
) -> Response {
    let details = request_id.map(|id| {
        let mut map = Map::new();
        map.insert("request_id".to_string(), Value::String(id));
        map
    });
    (status, Json(ErrorResponse::new(error_code, message, details))).into_response()
}

fn matched_path_or_uri<B>(request: &Request<B>) -> String {
    if let Some(path) = request.extensions().get::<MatchedPath>() {
        let resolved = path.as_str();
        debug_assert!(resolved.starts_with('/'));
        return resolved.to_string();
    }
    let fallback = request.uri().path().to_string();
    debug_assert!(fallback.starts_with('/'));
    fallback
}

fn header_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

fn resolve_listen_addr(settings: &Settings) -> Result<SocketAddr, ServerError> {
    debug_assert!(settings.host.len() <= 128);

    let host = settings.host.trim();
    if host.is_empty() {
        return Err(ServerError::EmptyHost);
    }

    let address = format!("{host}:{}", settings.port);
    address
        .parse()
        .map_err(|source| ServerError::InvalidListenAddr { address, source })
}

async fn bind_listener(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    debug_assert!(addr.ip().is_ipv4() || addr.ip().is_ipv6());

    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            address: addr.to_string(),
            source,
        })
}

async fn wait_for_shutdown() -> ShutdownEvent {
    debug_assert!(DRAIN_TIMEOUT >= Duration::from_secs(1));

    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ShutdownEvent::CtrlC,
            Err(error) => {
                tracing::warn!(%error, "failed to capture Ctrl+C signal");
                ShutdownEvent::ListenerFailed
            }
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => match term.recv().await {
                Some(_) => ShutdownEvent::SigTerm,
                None => ShutdownEvent::ListenerFailed,
            },
            Err(error) => {
                tracing::warn!(%error, "failed to capture SIGTERM");
                ShutdownEvent::ListenerFailed
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending();

    tokio::select! {
        event = ctrl_c => event,
        event = sigterm => event,
    }
}

fn broadcast_shutdown(
    sender: watch::Sender<ShutdownEvent>,
) -> impl Future<Output = ()> + Send + 'static {
    debug_assert!(!sender.is_closed());
    async move {
        let event = wait_for_shutdown().await;
        debug_assert!(event != ShutdownEvent::Pending);
        if let Err(error) = sender.send(event) {
            tracing::warn!(?event, %error, "failed to broadcast shutdown event");
        }
    }
}

fn drain_timeout_future(
    mut receiver: watch::Receiver<ShutdownEvent>,
) -> impl Future<Output = ()> + Send + 'static {
    debug_assert!(DRAIN_TIMEOUT.as_secs() >= 1);
    async move {
        if receiver.changed().await.is_ok() {
            let event = *receiver.borrow_and_update();
            debug_assert!(event != ShutdownEvent::Pending);
            tracing::info!(?event, "shutdown signal received; draining connections");
            tokio::time::sleep(DRAIN_TIMEOUT).await;
            tracing::warn!(
                ?event,
                seconds = DRAIN_TIMEOUT.as_secs(),
                "graceful shutdown timed out; continuing shutdown"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_host(host: &str, port: u16) -> Settings {
        Settings {
            host: host.to_string(),
            port,
            ..Settings::default()
        }
    }

    #[test]
    fn listen_addr_joins_host_and_port() {
        let settings = settings_with_host("127.0.0.1", 9000);
        let addr = resolve_listen_addr(&settings).expect("valid address");
        assert_eq!(addr.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn empty_host_is_rejected() {
        let settings = settings_with_host("  ", 9000);
        assert!(matches!(
            resolve_listen_addr(&settings),
            Err(ServerError::EmptyHost)
        ));
    }

    #[test]
    fn non_ip_host_is_rejected() {
        let settings = settings_with_host("not-an-ip", 9000);
        assert!(matches!(
            resolve_listen_addr(&settings),
            Err(ServerError::InvalidListenAddr { .. })
        ));
    }

    #[test]
    fn request_id_header_is_trimmed_and_filtered() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_request_id(&headers), None);

        headers.insert(REQUEST_ID_HEADER, " abc-123 ".parse().unwrap());
        assert_eq!(header_request_id(&headers), Some("abc-123".to_string()));

        headers.insert(REQUEST_ID_HEADER, "   ".parse().unwrap());
        assert_eq!(header_request_id(&headers), None);
    }
}
