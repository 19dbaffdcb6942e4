//! HTTP router setup.
//!
//! # Responsibilities
//! - Build the primary router (service info, liveness)
//! - Build the metrics router (Prometheus scrape)
//! - Wrap any handler with the per-listener connection layers
//!   (timeouts, request ID, tracing, in-flight accounting)
//! - Run the accept loop and own every connection it spawns
//!
//! # Design Decisions
//! - HTTP/1.1 only: each connection is a single task, so aborting the task
//!   ends every request on it
//! - Connections live in a `JoinSet`; a forced close aborts the set and waits
//!   for it to empty

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigSnapshot, ConnectionTimeouts};
use crate::net::InFlightTracker;

/// Static service facts served by the primary router.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: String,
    pub environment: String,
}

impl ServiceInfo {
    pub fn from_config(config: &ConfigSnapshot) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME"),
            version: config.version.clone(),
            environment: config.environment.clone(),
        }
    }
}

#[derive(Serialize)]
struct HealthBody<'a> {
    status: &'static str,
    #[serde(flatten)]
    info: &'a ServiceInfo,
}

/// Router for the primary listener.
///
/// Business routes are mounted by collaborators; this router only carries
/// the endpoints the process itself owns.
pub fn primary_router(config: &ConfigSnapshot) -> Router {
    let info = Arc::new(ServiceInfo::from_config(config));
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .with_state(info)
}

/// Router for the metrics listener.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(handle)
}

/// Apply the layers every listener gets, outermost last.
#[allow(deprecated)]
pub fn with_connection_layers(
    router: Router,
    timeouts: ConnectionTimeouts,
    tracker: InFlightTracker,
) -> Router {
    router
        .layer(middleware::from_fn_with_state(tracker, track_in_flight))
        .layer(TimeoutLayer::new(timeouts.write))
        .layer(RequestBodyTimeoutLayer::new(timeouts.read))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections on `listener` and serve `app` on each.
///
/// Stops accepting when `shutdown` is cancelled, then lets open connections
/// finish their current request. Cancelling `force` during that drain aborts
/// every remaining connection; the future resolves once they are gone.
pub async fn serve(
    service: &str,
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    force: CancellationToken,
) -> io::Result<()> {
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(service = %service, error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };

                if let Err(e) = socket.set_nodelay(true) {
                    tracing::debug!(service = %service, error = %e, "Failed to set TCP_NODELAY");
                }

                let app = app.clone();
                let handler = hyper::service::service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                    let mut app = app.clone();
                    async move { app.call(req.map(Body::new)).await }
                });
                let conn = graceful.watch(
                    http1::Builder::new()
                        .timer(TokioTimer::new())
                        .serve_connection(TokioIo::new(socket), handler),
                );

                connections.spawn(async move {
                    if let Err(e) = conn.await {
                        tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
                    }
                });
            }
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    tracing::warn!(service = %service, error = %e, "Connection task failed");
                }
            }
        }
    }

    drop(listener);
    tracing::debug!(service = %service, open = connections.len(), "Stopped accepting");

    tokio::select! {
        _ = graceful.shutdown() => {}
        _ = force.cancelled() => {
            tracing::warn!(service = %service, open = connections.len(), "Aborting open connections");
            connections.shutdown().await;
        }
    }
    Ok(())
}

async fn track_in_flight(
    State(tracker): State<InFlightTracker>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = tracker.track();
    next.run(request).await
}

async fn service_info(State(info): State<Arc<ServiceInfo>>) -> impl IntoResponse {
    Json(info.as_ref().clone())
}

async fn health(State(info): State<Arc<ServiceInfo>>) -> Response {
    Json(HealthBody {
        status: "ok",
        info: &info,
    })
    .into_response()
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as HttpRequest, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_environment() {
        let mut config = ConfigSnapshot::default();
        config.environment = "staging".into();
        let router = primary_router(&config);

        let response = router
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["environment"], "staging");
        assert_eq!(json["version"], "1.0.0");
    }

    #[tokio::test]
    async fn connection_layers_set_request_id() {
        let router = with_connection_layers(
            primary_router(&ConfigSnapshot::default()),
            ConnectionTimeouts::default(),
            InFlightTracker::new("primary"),
        );

        let response = router
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn in_flight_count_returns_to_zero() {
        let tracker = InFlightTracker::new("primary");
        let router = with_connection_layers(
            primary_router(&ConfigSnapshot::default()),
            ConnectionTimeouts::default(),
            tracker.clone(),
        );

        let response = router
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let router = metrics_router(crate::observability::metrics::detached_handle());
        let response = router
            .oneshot(HttpRequest::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
