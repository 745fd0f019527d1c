//! Ambient-identity echo handler.
//!
//! Demonstrates the query interface application logic uses inside an open
//! scope: no tenant parameter is threaded in, the handler just asks for the
//! current context.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tenon_core::current;

/// Returns the identity bound to the current request's scope.
///
/// `tenant: null` for untenanted requests. A missing scope altogether means
/// the pipeline is miswired and is reported as a server error rather than
/// masked as "no tenant".
pub async fn context_handler() -> Response {
    match current() {
        Ok(ctx) => Json(json!({
            "tenant": ctx.tenant().map(|t| json!({
                "id": t.id,
                "name": t.name.clone(),
            })),
            "principal": ctx.principal().map(|p| p.id.clone()),
            "session": ctx.session().map(|s| s.id.clone()),
        }))
        .into_response(),
        Err(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response(),
    }
}
