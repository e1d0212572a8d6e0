//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router: proxy routes under the prefix, static UI elsewhere
//! - Wire up middleware (request ID, tracing, body limit, concurrency limit)
//! - Run the route → dispatch → rewrite pipeline per request
//! - Serve on a listener until shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{limit::GlobalConcurrencyLimitLayer, ServiceExt};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::{request_id, UuidRequestId};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::metrics;
use crate::proxy::{Dispatcher, ResponseRewriter, Rewriter, UrlRewriter};
use crate::resilience::timeouts;
use crate::routing::RequestRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    pub dispatcher: Dispatcher,
    pub rewriter: ResponseRewriter,
    pub upstream_timeout: Duration,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server using the default URL rewriter.
    pub fn new(config: ProxyConfig) -> Self {
        Self::with_rewriter(config, Arc::new(UrlRewriter))
    }

    /// Create a server with a custom rewriting strategy.
    pub fn with_rewriter(config: ProxyConfig, strategy: Arc<dyn Rewriter>) -> Self {
        let state = AppState {
            router: Arc::new(RequestRouter::new(config.proxy.prefix.clone())),
            dispatcher: Dispatcher::new(&config.timeouts),
            rewriter: ResponseRewriter::new(strategy, config.proxy.max_rewrite_body_bytes),
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let prefix = state.router.prefix().to_string();

        let mut router = Router::new()
            .route(&format!("/{}", prefix), any(proxy_handler))
            .route(&format!("/{}/", prefix), any(proxy_handler))
            .route(&format!("/{}/{{*rest}}", prefix), any(proxy_handler))
            .with_state(state);

        if config.static_files.enabled {
            router = router.fallback_service(
                ServeDir::new(&config.static_files.dir).append_index_html_on_directories(true),
            );
        }

        router
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(req),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The request-handling entry point: one request in, one response out.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Clone of the configured router, e.g. to nest it into a larger app.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until a signal arrives or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.proxy.prefix,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler: route, forward, rewrite.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id(&request),
        method = %method,
        path = %request.uri().path(),
        "Proxying request"
    );

    let response = match forward(&state, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn forward(state: &AppState, request: Request<Body>) -> Result<Response, ProxyError> {
    let ctx = state.router.route(request.uri())?;
    let deadline = timeouts::deadline_after(state.upstream_timeout);

    let upstream = state.dispatcher.dispatch(&ctx, request, deadline).await?;
    tracing::debug!(
        target_origin = %ctx.target(),
        status = %upstream.status(),
        "Upstream responded"
    );

    state.rewriter.rewrite(&ctx, upstream, deadline).await
}
