//! Tenant identity and the directory lookup boundary.
//!
//! A [`TenantId`] is the externally visible identifier carried in request
//! paths and deferred-work envelopes. It is deliberately opaque and distinct
//! from whatever key the backing store uses internally, so a tenant can be
//! re-homed in storage without changing its public identity.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Externally visible tenant identifier.
///
/// Stable for the tenant's lifetime and resolvable to at most one
/// [`TenantRecord`] at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(u64);

impl TenantId {
    /// Wraps a raw external identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw external identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a tenant.
///
/// Archived tenants remain visible to directory administration but are not
/// valid targets for request routing or envelope restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantStatus {
    /// Tenant is live and resolvable.
    Active,
    /// Tenant has been archived; lookups for routing/restore must miss.
    Archived,
}

/// A tenant record as resolved from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// External identifier, as carried in paths and envelopes.
    pub id: TenantId,
    /// Human-readable tenant name.
    pub name: String,
    /// Lifecycle state.
    pub status: TenantStatus,
}

impl TenantRecord {
    /// Creates an active tenant record.
    #[must_use]
    pub fn new(id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: TenantStatus::Active,
        }
    }

    /// Whether this tenant is a valid resolution target.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Exact-match lookup store mapping external tenant identifiers to records.
///
/// The only shared resource in the propagation core. Read-only from the
/// core's perspective; implementations must tolerate concurrent queries
/// without external coordination.
///
/// Used as `&dyn TenantDirectory` / `Arc<dyn TenantDirectory>`.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Looks up a tenant by external id.
    ///
    /// Returns `Ok(None)` when no record exists for `id`. Archived records
    /// are returned as-is; callers decide whether archived counts as a miss.
    ///
    /// # Errors
    ///
    /// Returns an error only for backend failures (I/O, connectivity), never
    /// for a plain miss.
    async fn lookup(&self, id: TenantId) -> anyhow::Result<Option<TenantRecord>>;
}
