//! Request pipeline: configuration, transport middleware, tenant scoping,
//! and handlers.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod tenancy;

pub use config::NetworkConfig;
pub use handlers::{build_app, build_router, App, AppState};
pub use middleware::build_http_layers;
pub use tenancy::{MountPrefix, TenantScopeLayer, TenantScopeService};
