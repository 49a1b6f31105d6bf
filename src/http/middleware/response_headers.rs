//! Response header middleware.
//! Runs the header filter around the inner service.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use futures_util::FutureExt;

use crate::headers::HeaderFilter;
use crate::observability::metrics;

/// The active filter, swappable as a whole on reload.
#[derive(Clone, Default)]
pub struct SharedFilter {
    inner: Arc<ArcSwap<HeaderFilter>>,
}

impl SharedFilter {
    pub fn new(filter: HeaderFilter) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(filter)),
        }
    }

    /// Snapshot of the current filter.
    pub fn load(&self) -> Arc<HeaderFilter> {
        self.inner.load_full()
    }

    /// Replace the filter. Requests already in flight keep their snapshot.
    pub fn store(&self, filter: HeaderFilter) {
        self.inner.store(Arc::new(filter));
    }
}

/// Wrap every route of `router` with the header filter.
pub fn with_response_headers(router: Router, filter: SharedFilter) -> Router {
    router.layer(middleware::from_fn_with_state(filter, response_headers_middleware))
}

/// Applies early directives to a response shell, runs the inner service,
/// adopts its response into the shell, then applies late directives.
pub async fn response_headers_middleware(
    State(filter): State<SharedFilter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let filter = filter.load();

    let mut response = Response::new(Body::empty());
    filter
        .process_async(&mut response, move |shell| {
            async move {
                let inner = next.run(request).await;
                adopt(shell, inner);
            }
            .boxed()
        })
        .await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

/// Move `inner` into `shell`. Headers the inner service wrote replace
/// same-named headers already on the shell; the rest are kept.
fn adopt(shell: &mut Response<Body>, inner: Response<Body>) {
    let (mut parts, body) = inner.into_parts();
    let mut headers = std::mem::take(shell.headers_mut());
    headers.extend(parts.headers);
    parts.headers = headers;
    *shell = Response::from_parts(parts, body);
}
