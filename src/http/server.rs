//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the header middleware in front of every route
//! - Forward requests to the configured upstream, or answer locally
//! - Wire up middleware (tracing, timeouts)
//! - Recompile header directives when the configuration changes
//! - Bind server to listener and stop on shutdown

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Json, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::FilterConfig;
use crate::headers::RuntimeIdentity;
use crate::http::middleware::{response_headers_middleware, SharedFilter};

/// State for the forwarding handler.
#[derive(Clone)]
pub struct UpstreamState {
    pub client: Client<HttpConnector, Body>,
    pub authority: Authority,
}

/// HTTP server applying configured response headers.
pub struct HttpServer {
    router: Router,
    config: FilterConfig,
    filter: SharedFilter,
    overrides: HashMap<String, String>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self::with_properties(config, HashMap::new())
    }

    /// Create a server whose `{{PROP:..}}` lookups see `overrides` on top of
    /// the configured properties.
    pub fn with_properties(config: FilterConfig, overrides: HashMap<String, String>) -> Self {
        let filter = SharedFilter::new(config.build_filter(&overrides));
        let router = Self::build_router(&config, filter.clone());
        Self {
            router,
            config,
            filter,
            overrides,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &FilterConfig, filter: SharedFilter) -> Router {
        let app = match config
            .upstream
            .as_ref()
            .and_then(|u| Authority::from_str(&u.address).ok())
        {
            Some(authority) => {
                let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
                Router::new()
                    .route("/{*path}", any(proxy_handler))
                    .route("/", any(proxy_handler))
                    .with_state(UpstreamState { client, authority })
            }
            None => Router::new().fallback(status_handler),
        };

        // Headers wrap the timeout so timed-out responses still get them.
        app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    filter,
                    response_headers_middleware,
                ))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.timeouts.request_secs,
                ))),
        )
    }

    /// The router, for serving or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the active header filter.
    pub fn filter(&self) -> SharedFilter {
        self.filter.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, recompiling directives for
    /// every configuration received on `config_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<FilterConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            early = self.filter.load().directives().early().len(),
            late = self.filter.load().directives().late().len(),
            "HTTP server starting"
        );

        tokio::spawn(reload_directives(
            self.filter.clone(),
            self.overrides.clone(),
            self.config.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swaps in a freshly compiled filter for every received configuration until
/// the channel closes or shutdown fires.
async fn reload_directives(
    filter: SharedFilter,
    overrides: HashMap<String, String>,
    mut current: FilterConfig,
    mut config_updates: mpsc::UnboundedReceiver<FilterConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let new_config = tokio::select! {
            update = config_updates.recv() => match update {
                Some(config) => config,
                None => break,
            },
            _ = shutdown.recv() => break,
        };
        if needs_restart(&current, &new_config) {
            tracing::warn!("Listener and upstream changes take effect after restart");
        }
        filter.store(new_config.build_filter(&overrides));
        current = new_config;
        tracing::info!("Header directives reloaded");
    }
    tracing::debug!("Reload task stopped");
}

/// Whether `new` changes settings that are only read at startup.
fn needs_restart(current: &FilterConfig, new: &FilterConfig) -> bool {
    let upstream = |config: &FilterConfig| config.upstream.as_ref().map(|u| u.address.clone());
    new.listener.bind_address != current.listener.bind_address
        || upstream(new) != upstream(current)
}

/// Forwards the request to the upstream.
async fn proxy_handler(State(state): State<UpstreamState>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = Uri::from_parts(uri_parts).unwrap_or(parts.uri);

    let path = parts.uri.path().to_string();
    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(
                upstream = %state.authority,
                path = %path,
                error = %e,
                "Upstream error"
            );
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Answers locally when no upstream is configured.
async fn status_handler() -> impl IntoResponse {
    let identity = RuntimeIdentity::current();
    Json(json!({
        "status": "ok",
        "host": identity.host_name,
        "pid": identity.pid,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;

    fn with_header(value: &str) -> FilterConfig {
        let mut config = FilterConfig::default();
        config.headers.insert("X-Version".into(), value.into());
        config
    }

    #[test]
    fn test_needs_restart() {
        let base = with_header("1");
        assert!(!needs_restart(&base, &with_header("2")));

        let mut moved = with_header("1");
        moved.listener.bind_address = "127.0.0.1:1".into();
        assert!(needs_restart(&base, &moved));

        let mut proxied = with_header("1");
        proxied.upstream = Some(UpstreamConfig {
            address: "127.0.0.1:2".into(),
        });
        assert!(needs_restart(&base, &proxied));
    }

    #[tokio::test]
    async fn test_reload_tracks_latest_config() {
        let base = with_header("1");
        let filter = SharedFilter::new(base.build_filter(&HashMap::new()));
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(reload_directives(
            filter.clone(),
            HashMap::new(),
            base,
            updates_rx,
            shutdown_rx,
        ));

        let mut moved = with_header("2");
        moved.listener.bind_address = "127.0.0.1:1".into();
        updates_tx.send(moved.clone()).unwrap();
        moved.headers.insert("X-Version".into(), "3".into());
        updates_tx.send(moved).unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while filter.load().directives().early()[0].value() != "3" {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("reload not applied");

        // The sender is still alive; only shutdown can end the task.
        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("reload task ignored shutdown")
            .unwrap();
        drop(updates_tx);
    }
}
