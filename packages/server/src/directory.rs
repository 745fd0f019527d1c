//! In-memory tenant directory.
//!
//! Reference implementation of the lookup store mapping external tenant
//! identifiers to records. Backed by a concurrent map so the request and
//! worker pipelines can query it simultaneously without coordination.

use async_trait::async_trait;
use dashmap::DashMap;
use tenon_core::{TenantDirectory, TenantId, TenantRecord, TenantStatus};

/// `DashMap`-backed [`TenantDirectory`].
///
/// Admin operations (`insert`, `archive`, `remove`) model the tenant
/// lifecycle events the propagation core must cope with: a tenant that
/// disappears or is archived between envelope capture and restore.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: DashMap<u64, TenantRecord>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an active tenant, replacing any existing record.
    pub fn insert(&self, record: TenantRecord) {
        self.records.insert(record.id.get(), record);
    }

    /// Marks a tenant as archived. No-op if the tenant is unknown.
    pub fn archive(&self, id: TenantId) {
        if let Some(mut record) = self.records.get_mut(&id.get()) {
            record.status = TenantStatus::Archived;
        }
    }

    /// Removes a tenant record entirely, returning it if present.
    pub fn remove(&self, id: TenantId) -> Option<TenantRecord> {
        self.records.remove(&id.get()).map(|(_, record)| record)
    }

    /// Number of records, including archived ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the directory holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn lookup(&self, id: TenantId) -> anyhow::Result<Option<TenantRecord>> {
        Ok(self.records.get(&id.get()).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> TenantRecord {
        TenantRecord::new(TenantId::new(id), format!("tenant-{id}"))
    }

    #[tokio::test]
    async fn lookup_hits_inserted_record() {
        let directory = InMemoryDirectory::new();
        directory.insert(record(5_550_001));

        let found = directory.lookup(TenantId::new(5_550_001)).await.unwrap();
        assert_eq!(found.unwrap().name, "tenant-5550001");
    }

    #[tokio::test]
    async fn lookup_misses_unknown_id() {
        let directory = InMemoryDirectory::new();
        let found = directory.lookup(TenantId::new(404)).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn archive_keeps_the_record_but_deactivates_it() {
        let directory = InMemoryDirectory::new();
        directory.insert(record(5_550_001));
        directory.archive(TenantId::new(5_550_001));

        let found = directory
            .lookup(TenantId::new(5_550_001))
            .await
            .unwrap()
            .unwrap();
        assert!(!found.is_active());
        assert_eq!(directory.len(), 1);
    }

    #[tokio::test]
    async fn remove_deletes_the_record() {
        let directory = InMemoryDirectory::new();
        directory.insert(record(5_550_001));
        assert!(directory.remove(TenantId::new(5_550_001)).is_some());
        assert!(directory.is_empty());

        let found = directory.lookup(TenantId::new(5_550_001)).await.unwrap();
        assert!(found.is_none());
    }
}
