//! Tenant-scope middleware: the request-pipeline half of context propagation.
//!
//! For every request: resolve a candidate tenant segment out of the raw
//! path, look the candidate up in the directory, rewrite the request URI to
//! the routable remainder, and run the inner service inside a task-local
//! context scope. A path with no tenant segment opens an empty scope — the
//! route handlers decide whether untenanted access is allowed. A tenant
//! segment that does not resolve is a client-visible `404`, never a silent
//! fall-back to untenanted execution.
//!
//! Because the rewritten path must drive route matching, this layer wraps
//! the router itself rather than being added with `Router::layer` (see
//! [`build_app`](super::handlers::build_app)).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};
use tracing::{debug, warn};

use tenon_core::{
    with_context, ExecutionContext, PathResolution, TenantDirectory, TenantId, TenantResolver,
};

// ---------------------------------------------------------------------------
// MountPrefix
// ---------------------------------------------------------------------------

/// Request extension recording the tenant segment stripped from the original
/// path (e.g. `"/1234567"`), so handlers can generate links that stay inside
/// the tenant mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPrefix(pub String);

// ---------------------------------------------------------------------------
// TenantScopeLayer
// ---------------------------------------------------------------------------

/// Tower layer that resolves the tenant segment and scopes the inner service.
#[derive(Clone)]
pub struct TenantScopeLayer {
    resolver: Arc<TenantResolver>,
    directory: Arc<dyn TenantDirectory>,
}

impl TenantScopeLayer {
    /// Creates the layer from a configured resolver and the shared directory.
    #[must_use]
    pub fn new(resolver: TenantResolver, directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            resolver: Arc::new(resolver),
            directory,
        }
    }
}

impl<S> Layer<S> for TenantScopeLayer {
    type Service = TenantScopeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantScopeService {
            inner,
            resolver: Arc::clone(&self.resolver),
            directory: Arc::clone(&self.directory),
        }
    }
}

// ---------------------------------------------------------------------------
// TenantScopeService
// ---------------------------------------------------------------------------

/// Service wrapper that opens one context scope per request.
#[derive(Clone)]
pub struct TenantScopeService<S> {
    inner: S,
    resolver: Arc<TenantResolver>,
    directory: Arc<dyn TenantDirectory>,
}

impl<S> Service<Request<Body>> for TenantScopeService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let resolution = self.resolver.resolve(req.uri().path());
        let directory = Arc::clone(&self.directory);

        // Swap in the clone so the instance that was polled ready does the work.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let ctx = match resolution.tenant_id {
                None => ExecutionContext::empty(),
                Some(tenant_id) => match directory.lookup(tenant_id).await {
                    Ok(Some(tenant)) if tenant.is_active() => {
                        rewrite_mount(&mut req, &resolution);
                        ExecutionContext::for_tenant(tenant)
                    }
                    Ok(_) => {
                        debug!(%tenant_id, "request for unknown tenant");
                        return Ok(tenant_not_found(tenant_id));
                    }
                    Err(error) => {
                        warn!(%tenant_id, %error, "tenant directory lookup failed");
                        return Ok(directory_unavailable());
                    }
                },
            };

            // The scope covers exactly the inner service call; it is revoked
            // when this future completes, errors, or is dropped.
            with_context(ctx, inner.call(req)).await
        })
    }
}

/// Rewrites the request URI to the remainder behind the tenant mount,
/// preserving the query string, and records the stripped prefix.
fn rewrite_mount(req: &mut Request<Body>, resolution: &PathResolution) {
    let path_and_query = match req.uri().query() {
        Some(query) => format!("{}?{query}", resolution.remaining_path),
        None => resolution.remaining_path.clone(),
    };

    // remaining_path is a suffix of a valid URI path, so this parse cannot
    // fail in practice; keep the original URI rather than failing the request.
    let Ok(path_and_query) = path_and_query.parse::<PathAndQuery>() else {
        return;
    };
    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    if let Ok(uri) = Uri::from_parts(parts) {
        *req.uri_mut() = uri;
    }

    req.extensions_mut()
        .insert(MountPrefix(resolution.mount_prefix.clone()));
}

fn tenant_not_found(tenant_id: TenantId) -> Response {
    (
        StatusCode::NOT_FOUND,
        format!("unknown tenant {tenant_id}"),
    )
        .into_response()
}

fn directory_unavailable() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "tenant directory unavailable",
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
