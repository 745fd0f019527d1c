//! Deferred-work scheduling handler.
//!
//! The producing half of the outbound boundary: capture the ambient scope
//! into a [`WorkEnvelope`] and hand it to the queue. The handler never
//! names the tenant — capture reads it from the scope the tenant layer
//! opened.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tenon_core::WorkEnvelope;
use tracing::warn;
use uuid::Uuid;

use super::AppState;
use crate::worker::{enqueue, JobPayload};

/// Body of `POST /jobs`.
#[derive(Debug, Deserialize)]
pub struct EnqueueJob {
    /// Free-form job kind tag.
    pub kind: String,
    /// Kind-specific arguments.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Schedules a deferred job carrying the current scope's identity.
pub async fn enqueue_job_handler(
    State(state): State<AppState>,
    Json(request): Json<EnqueueJob>,
) -> Response {
    let payload = JobPayload {
        job_id: Uuid::new_v4(),
        kind: request.kind,
        data: request.data,
    };
    let job_id = payload.job_id;

    let envelope = match WorkEnvelope::capture(payload) {
        Ok(envelope) => envelope,
        // No scope open on a routed request: the pipeline is miswired.
        Err(error) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response();
        }
    };

    if let Err(error) = enqueue(state.queue.as_ref(), &envelope).await {
        warn!(%error, %job_id, "failed to enqueue deferred job");
        return (StatusCode::SERVICE_UNAVAILABLE, "queue unavailable").into_response();
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "job_id": job_id,
            "tenant_id": envelope.tenant_id,
        })),
    )
        .into_response()
}
