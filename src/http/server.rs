//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the route table (public pages + secret internal-operations group)
//! - Send every route through the dispatch wrapper
//! - Wire middleware (HTTP trace layer)
//! - Serve on an acquired listener with graceful shutdown

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::http::dispatch::{self, dispatch};
use crate::portal::handlers;
use crate::portal::internal;
use crate::portal::state::SharedState;

/// HTTP server for the portal.
pub struct PortalServer {
    router: Router,
}

impl PortalServer {
    /// Create a server with the full route table for the given state.
    pub fn new(state: SharedState) -> Self {
        Self {
            router: router(state),
        }
    }

    /// Serve until the shutdown channel fires, then drain and return.
    ///
    /// Stops accepting as soon as the signal arrives; in-flight requests
    /// run to completion before this returns.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "portal server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("draining in-flight requests");
            })
            .await?;

        tracing::info!("portal server stopped");
        Ok(())
    }
}

/// The full route table. Public paths are contest-gated by the dispatcher;
/// the internal-operations group shares the secret prefix and bypasses the
/// gate.
pub fn router(state: SharedState) -> Router {
    let prefix = state.config.internal.path_prefix.clone();
    let internal_path = |tail: &str| format!("/{prefix}/{tail}");

    Router::new()
        .route("/", dispatch(handlers::serve_index))
        .route("/favicon.ico", dispatch(handlers::serve_favicon))
        .route("/login", dispatch(handlers::serve_login))
        .route("/static/{*path}", dispatch(handlers::serve_static))
        .route("/queue", dispatch(handlers::serve_queue_job))
        .route("/team", dispatch(handlers::serve_update_team))
        .route(
            &internal_path("proxy/update"),
            dispatch(internal::serve_proxy_update),
        )
        .route(
            &internal_path("proxy/nginx.conf"),
            dispatch(internal::serve_proxy_nginx_conf),
        )
        .route(&internal_path("job/new"), dispatch(internal::serve_new_job))
        .route(
            &internal_path("job/result"),
            dispatch(internal::serve_post_result),
        )
        .route(
            &internal_path("debug/vars"),
            dispatch(internal::serve_debug_vars),
        )
        .route(
            &internal_path("debug/queue"),
            dispatch(internal::serve_debug_queue),
        )
        .route(
            &internal_path("debug/leaderboard"),
            dispatch(internal::serve_debug_leaderboard),
        )
        .route(
            &internal_path("debug/proxies"),
            dispatch(internal::serve_debug_proxies),
        )
        .route(
            &internal_path("messages"),
            dispatch(internal::serve_messages),
        )
        .fallback(fallback)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Unmatched paths still go through the dispatcher so the one-log-line
/// guarantee holds for every request.
async fn fallback(
    State(state): State<SharedState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> Response {
    dispatch::run(handlers::serve_not_found, state, remote, req).await
}
