//! Health and liveness endpoint handlers.
//!
//! These handlers expose server health information for orchestrators and
//! operational monitoring. They are reachable both untenanted (`/health`)
//! and through a tenant mount (`/1234567/health`), since probes don't carry
//! tenant prefixes but humans poking a tenant deployment might.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns basic operational information as JSON.
///
/// Always returns 200 -- the payload is informational, not a readiness
/// signal.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tenants = state.directory.len();
    let queue_depth = state.queue.depth();
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "state": "ok",
        "tenants": tenants,
        "queue_depth": queue_depth,
        "uptime_secs": uptime_secs,
    }))
}

/// Liveness probe -- always returns 200 OK.
///
/// Only checks whether the process is running and responsive; it
/// intentionally ignores downstream dependencies.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::super::test_support::seeded_state;
    use super::*;
    use crate::worker::{EnvelopeQueue, QueueItem};

    #[tokio::test]
    async fn health_handler_returns_json_with_all_fields() {
        let (state, _, _) = seeded_state();
        let response = health_handler(State(state)).await;
        let json = response.0;

        assert_eq!(json["state"], "ok");
        assert_eq!(json["tenants"], 1);
        assert_eq!(json["queue_depth"], 0);
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn health_handler_reports_queue_depth() {
        let (state, _, queue) = seeded_state();
        queue.push(QueueItem::new(vec![0x90])).await.unwrap();

        let response = health_handler(State(state)).await;
        assert_eq!(response.0["queue_depth"], 1);
    }

    #[tokio::test]
    async fn liveness_handler_always_returns_200() {
        let status = liveness_handler().await;
        assert_eq!(status, StatusCode::OK);
    }
}
