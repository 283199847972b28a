use async_trait::async_trait;
use hackhub::domain::context::OpContext;
use hackhub::domain::entities::ResourceId;
use hackhub::domain::errors::{RepositoryError, RepositoryResult};
use hackhub::domain::ports::{Document, DocumentStore, Filter, Query};
use hackhub::infrastructure::persistence::{Database, InMemoryDocumentStore};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn memory_store() -> Arc<dyn DocumentStore> {
    Arc::new(InMemoryDocumentStore::new())
}

pub async fn setup_test_db() -> Database {
    // Use file-based SQLite for tests (unique UUID per test for parallel execution)
    let temp_file = format!("test_{}.db", Uuid::new_v4());
    let db_url = format!("sqlite://{}?mode=rwc", temp_file);

    let db = Database::connect(&db_url)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    db
}

/// Wraps a store and injects failures or interleaved writes.
///
/// Cascading deletes use the port's fallback, so they go through the wrapped
/// `update_many` and `delete`.
pub struct FailingStore {
    inner: Arc<dyn DocumentStore>,
    fail_inserts: AtomicBool,
    fail_update_many: AtomicBool,
    // Deleted from `inner` right before the next single-document update.
    delete_before_update: Mutex<Option<(String, ResourceId)>>,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            fail_inserts: AtomicBool::new(false),
            fail_update_many: AtomicBool::new(false),
            delete_before_update: Mutex::new(None),
        }
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update_many(&self, fail: bool) {
        self.fail_update_many.store(fail, Ordering::SeqCst);
    }

    /// Simulate a concurrent delete of `collection/id` landing just before the next
    /// `update` call.
    pub fn delete_before_next_update(&self, collection: &str, id: ResourceId) {
        *self.delete_before_update.lock().expect("lock poisoned") =
            Some((collection.to_string(), id));
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn insert(
        &self,
        ctx: &OpContext,
        collection: &str,
        body: Value,
    ) -> RepositoryResult<ResourceId> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::StoreFailure("disk full".to_string()));
        }
        self.inner.insert(ctx, collection, body).await
    }

    async fn find(
        &self,
        ctx: &OpContext,
        collection: &str,
        query: &Query,
    ) -> RepositoryResult<Vec<Document>> {
        self.inner.find(ctx, collection, query).await
    }

    async fn find_one(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
    ) -> RepositoryResult<Option<Document>> {
        self.inner.find_one(ctx, collection, filter).await
    }

    async fn find_by_id(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
    ) -> RepositoryResult<Option<Document>> {
        self.inner.find_by_id(ctx, collection, id).await
    }

    async fn update(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
        patch: Value,
    ) -> RepositoryResult<bool> {
        let interleaved = self.delete_before_update.lock().expect("lock poisoned").take();
        if let Some((other, other_id)) = interleaved {
            self.inner.delete(ctx, &other, other_id).await?;
        }
        self.inner.update(ctx, collection, id, patch).await
    }

    async fn update_many(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> RepositoryResult<u64> {
        if self.fail_update_many.load(Ordering::SeqCst) {
            return Err(RepositoryError::StoreFailure("disk full".to_string()));
        }
        self.inner.update_many(ctx, collection, filter, patch).await
    }

    async fn delete(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
    ) -> RepositoryResult<bool> {
        self.inner.delete(ctx, collection, id).await
    }

    async fn count(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
    ) -> RepositoryResult<u64> {
        self.inner.count(ctx, collection, filter).await
    }
}
