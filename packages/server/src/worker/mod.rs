//! Deferred-work consumption: queue boundary and worker pipeline.
//!
//! - [`queue`]: the durable-queue collaborator interface and in-memory impl
//! - [`pipeline`]: restores envelope contexts and runs payload handlers

pub mod pipeline;
pub mod queue;

pub use pipeline::{
    enqueue, DeferredRunnable, RestoreDisposition, WorkerConfig, WorkerPipeline,
};
pub use queue::{DeadLetter, EnvelopeQueue, InMemoryQueue, QueueItem};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Demo payload type carried by the server's `POST /jobs` endpoint.
///
/// Opaque to the propagation core; the worker pipeline only cares that it
/// round-trips through the envelope codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    /// Unique id assigned at enqueue time.
    pub job_id: Uuid,
    /// Free-form job kind tag.
    pub kind: String,
    /// Kind-specific arguments.
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_payload_round_trips_through_the_envelope_codec() {
        let payload = JobPayload {
            job_id: Uuid::new_v4(),
            kind: "send-digest".to_string(),
            data: serde_json::json!({ "board": 9 }),
        };

        let envelope = tenon_core::WorkEnvelope {
            payload: payload.clone(),
            tenant_id: None,
            principal: None,
        };
        let bytes = envelope.to_msgpack().unwrap();
        let back = tenon_core::WorkEnvelope::<JobPayload>::from_msgpack(&bytes).unwrap();
        assert_eq!(back.payload, payload);
    }
}
