use async_trait::async_trait;
use serde_json::Value;

use crate::domain::context::OpContext;
use crate::domain::entities::ResourceId;
use crate::domain::errors::RepositoryResult;

/// A raw stored document. `body` never carries the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: ResourceId,
    pub body: Value,
}

/// Conjunction of top-level field equalities. An empty filter matches everything;
/// equality against `null` never matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn matches(&self, body: &Value) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            !expected.is_null() && body.get(field).is_some_and(|actual| actual == expected)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

/// Without a sort the store returns documents in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Query {
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }
}

/// Merge patch applied to every document in `collection` matching `filter` when the
/// document they depend on is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub collection: String,
    pub filter: Filter,
    pub patch: Value,
}

/// Collection-scoped document operations the repositories are built on.
///
/// Every call runs under `ctx`; implementations abort the in-flight operation and
/// return `Cancelled` once the context is cancelled or past its deadline.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document and return the identifier assigned to it.
    async fn insert(&self, ctx: &OpContext, collection: &str, body: Value)
        -> RepositoryResult<ResourceId>;

    async fn find(&self, ctx: &OpContext, collection: &str, query: &Query)
        -> RepositoryResult<Vec<Document>>;

    /// First match in insertion order.
    async fn find_one(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
    ) -> RepositoryResult<Option<Document>>;

    async fn find_by_id(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
    ) -> RepositoryResult<Option<Document>>;

    /// Apply an RFC 7396 merge patch as one atomic operation. Returns `false` when no
    /// document has `id`.
    async fn update(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
        patch: Value,
    ) -> RepositoryResult<bool>;

    /// Apply a merge patch to every match, returning how many documents changed.
    async fn update_many(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> RepositoryResult<u64>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, ctx: &OpContext, collection: &str, id: ResourceId)
        -> RepositoryResult<bool>;

    async fn count(&self, ctx: &OpContext, collection: &str, filter: &Filter)
        -> RepositoryResult<u64>;

    /// Apply `cascade` and then delete `id`, returning how many dependents changed.
    ///
    /// Stores that can should run both steps atomically. The fallback resets the
    /// dependents first, so a failure part way leaves the document in place and the
    /// whole call can be retried.
    async fn delete_cascading(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
        cascade: Cascade,
    ) -> RepositoryResult<u64> {
        let changed = self
            .update_many(ctx, &cascade.collection, &cascade.filter, cascade.patch)
            .await?;
        self.delete(ctx, collection, id).await?;
        Ok(changed)
    }
}

/// RFC 7396 merge: objects merge key by key, `null` removes a key, anything else
/// replaces the target wholesale.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }

    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if value.is_null() {
                target_fields.remove(key);
            } else {
                merge_patch(
                    target_fields.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}
