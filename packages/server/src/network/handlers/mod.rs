//! HTTP handler definitions for the Tenon server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors), the route table, and `build_app`, which composes the
//! transport middleware, the tenant-scope layer, and the router into the
//! servable request pipeline.

pub mod context;
pub mod health;
pub mod jobs;

pub use context::context_handler;
pub use health::{health_handler, liveness_handler};
pub use jobs::enqueue_job_handler;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tenon_core::{ResolverConfigError, TenantDirectory, TenantResolver};
use tower::util::BoxCloneService;
use tower::ServiceBuilder;

use super::config::NetworkConfig;
use super::middleware::build_http_layers;
use super::tenancy::TenantScopeLayer;
use crate::directory::InMemoryDirectory;
use crate::worker::EnvelopeQueue;

/// Shared application state passed to all axum handlers via `State`
/// extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// The shared tenant lookup store.
    pub directory: Arc<InMemoryDirectory>,
    /// Producer side of the deferred-work queue.
    pub queue: Arc<dyn EnvelopeQueue>,
    /// Network configuration (bind address, timeouts, tenancy policy).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

/// Builds the route table. All paths here are mount-relative: the
/// tenant-scope layer has already stripped any tenant prefix by the time
/// routing happens.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/livez", get(liveness_handler))
        .route("/context", get(context_handler))
        .route("/jobs", post(enqueue_job_handler))
        .with_state(state)
}

/// The servable request pipeline produced by [`build_app`].
pub type App = BoxCloneService<Request<Body>, Response, Infallible>;

/// Composes the full request pipeline: transport middleware around the
/// tenant-scope layer around the router.
///
/// The tenant-scope layer sits outside the router (not in `Router::layer`)
/// because its URI rewrite must happen before route matching.
///
/// # Errors
///
/// Returns [`ResolverConfigError`] when the configured tenancy policy is
/// rejected at construction time.
pub fn build_app(state: AppState) -> Result<App, ResolverConfigError> {
    let resolver = TenantResolver::new(&state.config.tenancy)?;
    let tenant_layer = TenantScopeLayer::new(
        resolver,
        Arc::clone(&state.directory) as Arc<dyn TenantDirectory>,
    );
    let http_layers = build_http_layers(&state.config);
    let router = build_router(state);

    Ok(BoxCloneService::new(
        ServiceBuilder::new()
            .map_response(|response: Response<_>| response.map(Body::new))
            .layer(http_layers)
            .layer(tenant_layer)
            .service(router),
    ))
}

#[cfg(test)]
pub(crate) mod test_support {
    use tenon_core::{TenantId, TenantRecord};

    use super::*;
    use crate::worker::InMemoryQueue;

    /// State with one active tenant (`5550001`) and an empty queue.
    pub(crate) fn seeded_state() -> (AppState, Arc<InMemoryDirectory>, Arc<InMemoryQueue>) {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.insert(TenantRecord::new(TenantId::new(5_550_001), "acme"));
        let queue = Arc::new(InMemoryQueue::new());

        let state = AppState {
            directory: Arc::clone(&directory),
            queue: queue.clone(),
            config: Arc::new(NetworkConfig::default()),
            start_time: Instant::now(),
        };
        (state, directory, queue)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::test_support::seeded_state;
    use super::*;

    #[tokio::test]
    async fn app_serves_through_the_full_stack() {
        let (state, _, _) = seeded_state();
        let app = build_app(state).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/5550001/context")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // Transport middleware assigned a request id.
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn app_rejects_unknown_tenant_before_routing() {
        let (state, _, _) = seeded_state();
        let app = build_app(state).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/9990009/context")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn degenerate_tenancy_config_fails_at_build_time() {
        let (mut state, _, _) = seeded_state();
        let mut config = NetworkConfig::default();
        config.tenancy.min_digits = 0;
        state.config = Arc::new(config);

        assert!(build_app(state).is_err());
    }
}
