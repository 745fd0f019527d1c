//! Deferred-work envelopes.
//!
//! A [`WorkEnvelope`] carries a unit of deferred work across a boundary with
//! no shared memory: it holds the payload plus the minimal identity
//! references (tenant id, principal) needed to rebuild an equivalent
//! [`ExecutionContext`] on the other side. It never embeds a live context —
//! restore always performs a fresh directory lookup and never assumes the
//! original in-memory tenant record is still valid.
//!
//! # Wire format
//!
//! Envelopes serialize to MsgPack via `rmp-serde` so they can be handed to a
//! durable queue and decoded by a worker in another process that shares only
//! the tenant directory.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::context::{ExecutionContext, Principal};
use crate::scope::{self, ScopeError};
use crate::tenant::{TenantDirectory, TenantId};

/// A serializable record of deferred work plus captured identity references.
///
/// `tenant_id = None` means the work was scheduled from an untenanted scope
/// — "no tenant", not "unspecified". The payload is opaque to the
/// propagation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEnvelope<P> {
    /// The data needed to perform the deferred logic.
    pub payload: P,
    /// Captured tenant reference, if the scheduling scope was tenanted.
    pub tenant_id: Option<TenantId>,
    /// Captured principal reference, if the scheduling scope carried one.
    pub principal: Option<Principal>,
}

/// Failures reconstructing a context from a captured envelope.
///
/// The unresolvable-tenant case is a distinct variant so the worker pipeline
/// can choose retry, dead-letter, or drop without string-matching a generic
/// lookup error.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// The captured tenant reference no longer resolves (deleted or
    /// archived between capture and restore).
    #[error("captured tenant {tenant_id} no longer resolves")]
    UnresolvableTenant {
        /// The tenant reference that failed to resolve.
        tenant_id: TenantId,
    },
    /// The directory query itself failed.
    #[error("tenant directory lookup failed")]
    Directory(#[source] anyhow::Error),
}

/// Envelope wire-codec failures.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The envelope could not be encoded.
    #[error("envelope encode failed")]
    Encode(#[source] rmp_serde::encode::Error),
    /// The bytes are not a valid envelope.
    #[error("envelope decode failed")]
    Decode(#[source] rmp_serde::decode::Error),
}

impl<P> WorkEnvelope<P> {
    /// Captures the ambient scope into an envelope around `payload`.
    ///
    /// Reads the nearest enclosing scope's tenant and principal references.
    /// An open untenanted scope captures `tenant_id = None`.
    ///
    /// # Errors
    ///
    /// [`ScopeError::NoActiveScope`] when called with no scope open —
    /// scheduling deferred work outside a unit of work is a programmer
    /// error, not an untenanted envelope.
    pub fn capture(payload: P) -> Result<Self, ScopeError> {
        let ctx = scope::current()?;
        Ok(Self {
            payload,
            tenant_id: ctx.tenant().map(|t| t.id),
            principal: ctx.principal().cloned(),
        })
    }

    /// Rebuilds an execution context equivalent to the one this envelope was
    /// captured from, via a fresh directory lookup.
    ///
    /// # Errors
    ///
    /// [`RestoreError::UnresolvableTenant`] when the captured tenant no
    /// longer resolves to an active record; [`RestoreError::Directory`] when
    /// the lookup backend fails. Never falls back to an untenanted context
    /// when a tenant was captured.
    pub async fn restore(
        &self,
        directory: &dyn TenantDirectory,
    ) -> Result<ExecutionContext, RestoreError> {
        let ctx = match self.tenant_id {
            None => ExecutionContext::empty(),
            Some(tenant_id) => {
                let record = directory
                    .lookup(tenant_id)
                    .await
                    .map_err(RestoreError::Directory)?;
                match record {
                    Some(tenant) if tenant.is_active() => ExecutionContext::for_tenant(tenant),
                    _ => return Err(RestoreError::UnresolvableTenant { tenant_id }),
                }
            }
        };
        Ok(match &self.principal {
            Some(principal) => ctx.with_principal(principal.clone()),
            None => ctx,
        })
    }

    /// Encodes the envelope for transport through a durable queue.
    ///
    /// # Errors
    ///
    /// [`CodecError::Encode`] when the payload cannot be serialized.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, CodecError>
    where
        P: Serialize,
    {
        rmp_serde::to_vec_named(self).map_err(CodecError::Encode)
    }

    /// Decodes an envelope received from a durable queue.
    ///
    /// # Errors
    ///
    /// [`CodecError::Decode`] when the bytes are not a valid envelope.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, CodecError>
    where
        P: DeserializeOwned,
    {
        rmp_serde::from_slice(bytes).map_err(CodecError::Decode)
    }
}
