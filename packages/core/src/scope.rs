//! Task-local context scoping.
//!
//! Binds an [`ExecutionContext`] to the dynamic extent of one unit of work.
//! The binding lives in tokio task-local storage, so it follows the logical
//! task rather than the physical thread: it survives suspension points,
//! travels with the task when the scheduler moves it between pooled worker
//! threads, is invisible to every other task, and is revoked on normal exit,
//! panic, and cancellation alike. Nested scopes shadow and precisely restore
//! the enclosing binding.
//!
//! Query operations read the nearest enclosing scope and never fetch from
//! storage. Calling one with no scope open is a programmer error surfaced as
//! [`ScopeError::NoActiveScope`] — deliberately distinct from an open scope
//! that carries no tenant, which is a valid state with different
//! authorization implications.

use std::future::Future;

use tokio::task_local;

use crate::context::{ExecutionContext, Principal, Session};
use crate::tenant::TenantRecord;

task_local! {
    static CURRENT_CONTEXT: ExecutionContext;
}

/// Failures of the scope query operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// A current-context query ran on a task with no open scope.
    #[error("no execution scope is open on this task")]
    NoActiveScope,
}

/// Runs `work` with `ctx` as the ambient execution context.
///
/// The binding covers the entire dynamic extent of `work`, including nested
/// calls and suspension points, but not tasks it spawns — deferred or
/// concurrent work must carry its context explicitly (see
/// [`WorkEnvelope`](crate::envelope::WorkEnvelope)). On exit the previous
/// enclosing binding, if any, becomes visible again.
pub async fn with_context<F>(ctx: ExecutionContext, work: F) -> F::Output
where
    F: Future,
{
    CURRENT_CONTEXT.scope(ctx, work).await
}

/// Synchronous variant of [`with_context`] for non-async call paths.
pub fn with_context_sync<F, R>(ctx: ExecutionContext, work: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT_CONTEXT.sync_scope(ctx, work)
}

/// Snapshots the ambient context of the nearest enclosing scope.
///
/// # Errors
///
/// [`ScopeError::NoActiveScope`] when called outside any scope.
pub fn current() -> Result<ExecutionContext, ScopeError> {
    CURRENT_CONTEXT
        .try_with(Clone::clone)
        .map_err(|_| ScopeError::NoActiveScope)
}

/// The current tenant, or `Ok(None)` inside an untenanted scope.
///
/// # Errors
///
/// [`ScopeError::NoActiveScope`] when called outside any scope.
pub fn current_tenant() -> Result<Option<TenantRecord>, ScopeError> {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.tenant().cloned())
        .map_err(|_| ScopeError::NoActiveScope)
}

/// The current principal, or `Ok(None)` for unauthenticated work.
///
/// # Errors
///
/// [`ScopeError::NoActiveScope`] when called outside any scope.
pub fn current_principal() -> Result<Option<Principal>, ScopeError> {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.principal().cloned())
        .map_err(|_| ScopeError::NoActiveScope)
}

/// The current session reference, if one was bound.
///
/// # Errors
///
/// [`ScopeError::NoActiveScope`] when called outside any scope.
pub fn current_session() -> Result<Option<Session>, ScopeError> {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.session().cloned())
        .map_err(|_| ScopeError::NoActiveScope)
}

/// Whether any scope is open on the calling task.
#[must_use]
pub fn scope_active() -> bool {
    CURRENT_CONTEXT.try_with(|_| ()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantId;

    fn tenant(id: u64) -> TenantRecord {
        TenantRecord::new(TenantId::new(id), format!("tenant-{id}"))
    }

    #[tokio::test]
    async fn queries_observe_the_bound_context() {
        let ctx = ExecutionContext::for_tenant(tenant(1_000_001))
            .with_principal(Principal::new("user-1"));

        with_context(ctx, async {
            assert_eq!(
                current_tenant().unwrap().unwrap().id,
                TenantId::new(1_000_001)
            );
            assert_eq!(current_principal().unwrap().unwrap().id, "user-1");
            assert_eq!(current_session().unwrap(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn queries_fail_loudly_outside_any_scope() {
        assert_eq!(current().unwrap_err(), ScopeError::NoActiveScope);
        assert_eq!(current_tenant().unwrap_err(), ScopeError::NoActiveScope);
        assert!(!scope_active());
    }

    #[tokio::test]
    async fn untenanted_scope_is_distinct_from_no_scope() {
        with_context(ExecutionContext::empty(), async {
            assert!(scope_active());
            // Open scope, no tenant: a valid state, not an error.
            assert_eq!(current_tenant().unwrap(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn nested_scope_shadows_and_restores() {
        let outer = ExecutionContext::for_tenant(tenant(1_000_001));
        let inner = ExecutionContext::for_tenant(tenant(2_000_002));

        with_context(outer, async {
            assert_eq!(
                current_tenant().unwrap().unwrap().id,
                TenantId::new(1_000_001)
            );

            with_context(inner, async {
                assert_eq!(
                    current_tenant().unwrap().unwrap().id,
                    TenantId::new(2_000_002)
                );
            })
            .await;

            // Inner exit restores the outer binding, not an empty one.
            assert_eq!(
                current_tenant().unwrap().unwrap().id,
                TenantId::new(1_000_001)
            );
        })
        .await;
    }

    #[tokio::test]
    async fn binding_survives_suspension_points() {
        with_context(ExecutionContext::for_tenant(tenant(1_000_001)), async {
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            assert_eq!(
                current_tenant().unwrap().unwrap().id,
                TenantId::new(1_000_001)
            );
        })
        .await;
    }

    #[tokio::test]
    async fn scope_is_revoked_after_exit() {
        with_context(ExecutionContext::for_tenant(tenant(1_000_001)), async {}).await;
        assert!(!scope_active());
    }

    #[test]
    fn sync_scope_binds_and_reverts() {
        let ctx = ExecutionContext::for_tenant(tenant(3_000_003));
        let seen = with_context_sync(ctx, || current_tenant().unwrap().map(|t| t.id));
        assert_eq!(seen, Some(TenantId::new(3_000_003)));
        assert!(!scope_active());
    }

    #[test]
    fn sync_scope_reverts_on_panic() {
        let result = std::panic::catch_unwind(|| {
            with_context_sync(ExecutionContext::for_tenant(tenant(1)), || {
                panic!("handler failure")
            })
        });
        assert!(result.is_err());
        // Unwinding revoked the binding.
        assert!(!scope_active());
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_the_scope() {
        with_context(ExecutionContext::for_tenant(tenant(1_000_001)), async {
            let handle = tokio::spawn(async { scope_active() });
            assert!(!handle.await.unwrap());
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_tasks_never_observe_each_other() {
        // Many tasks with distinct tenants on a small worker pool; each
        // samples its tenant across repeated yields. Reused threads must
        // show no residue from previous occupants.
        let mut handles = Vec::new();
        for id in 1..=32u64 {
            handles.push(tokio::spawn(with_context(
                ExecutionContext::for_tenant(tenant(1_000_000 + id)),
                async move {
                    for _ in 0..50 {
                        let seen = current_tenant().unwrap().unwrap().id;
                        assert_eq!(seen, TenantId::new(1_000_000 + id));
                        tokio::task::yield_now().await;
                    }
                },
            )));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_unwinds_through_an_open_scope() {
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(with_context(
            ExecutionContext::for_tenant(tenant(1_000_001)),
            async move {
                let _ = started_tx.send(());
                // Park until aborted.
                std::future::pending::<()>().await;
            },
        ));

        started_rx.await.unwrap();
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        // The aborted task's binding is gone; this task never had one.
        assert!(!scope_active());
    }
}
