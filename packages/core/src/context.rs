//! The per-unit-of-work execution context.
//!
//! An [`ExecutionContext`] carries the ambient identity values (tenant,
//! principal, session) a unit of work needs without explicit parameter
//! threading. It is created during pipeline setup, populated at most once
//! per field, and read-only for the rest of the unit of work. Each unit of
//! work gets its own value; contexts are never shared mutably across
//! concurrently executing work.

use serde::{Deserialize, Serialize};

use crate::tenant::TenantRecord;

/// Authenticated identity performing an action, distinct from the tenant it
/// acts within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier for the authenticated entity.
    pub id: String,
    /// Roles assigned to this principal for authorization checks.
    pub roles: Vec<String>,
}

impl Principal {
    /// Creates a principal with no roles.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }
}

/// Opaque reference to an authenticated session.
///
/// Session issuance and validation belong to a collaborator; the core only
/// carries the reference through a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier.
    pub id: String,
}

/// Ambient values for one unit of work.
///
/// Fields are private: the only way to set them is the consuming builder
/// methods below, used exactly once per field during pipeline setup. An open
/// scope cannot have its bound values changed in place, which keeps a
/// handler from switching tenant mid-flight.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    tenant: Option<TenantRecord>,
    principal: Option<Principal>,
    session: Option<Session>,
}

impl ExecutionContext {
    /// An untenanted, unauthenticated context.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A context bound to a resolved tenant.
    #[must_use]
    pub fn for_tenant(tenant: TenantRecord) -> Self {
        Self {
            tenant: Some(tenant),
            principal: None,
            session: None,
        }
    }

    /// Attaches the authenticated principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Attaches the session reference.
    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// The tenant this unit of work executes within, if any.
    #[must_use]
    pub fn tenant(&self) -> Option<&TenantRecord> {
        self.tenant.as_ref()
    }

    /// The authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The session reference, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}
