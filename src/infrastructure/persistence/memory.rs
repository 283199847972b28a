use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::context::OpContext;
use crate::domain::entities::ResourceId;
use crate::domain::errors::RepositoryResult;
use crate::domain::ports::{
    merge_patch, Cascade, Document, DocumentStore, Filter, Query, SortOrder,
};

/// Process-local document store with the same ordering and patch semantics as the
/// SQL one. Used for `DATABASE_URL=memory://` and in tests.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    // Each collection keeps insertion order.
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// SQLite orders NULL below every value; mirror that for missing fields.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(
        &self,
        ctx: &OpContext,
        collection: &str,
        body: Value,
    ) -> RepositoryResult<ResourceId> {
        ctx.run(async {
            let id = ResourceId::new();
            self.collections
                .write()
                .await
                .entry(collection.to_string())
                .or_default()
                .push(Document { id, body });
            Ok(id)
        })
        .await
    }

    async fn find(
        &self,
        ctx: &OpContext,
        collection: &str,
        query: &Query,
    ) -> RepositoryResult<Vec<Document>> {
        ctx.run(async {
            let collections = self.collections.read().await;
            let Some(documents) = collections.get(collection) else {
                return Ok(Vec::new());
            };

            let mut matched: Vec<(usize, &Document)> = documents
                .iter()
                .enumerate()
                .filter(|(_, doc)| query.filter.matches(&doc.body))
                .collect();

            if let Some(sort) = &query.sort {
                matched.sort_by(|(seq_a, a), (seq_b, b)| {
                    let ordering = compare_fields(a.body.get(&sort.field), b.body.get(&sort.field))
                        .then(seq_a.cmp(seq_b));
                    match sort.order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                });
            }

            let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
            let limit = query
                .limit
                .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
                .unwrap_or(usize::MAX);

            Ok(matched
                .into_iter()
                .skip(skip)
                .take(limit)
                .map(|(_, doc)| doc.clone())
                .collect())
        })
        .await
    }

    async fn find_one(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
    ) -> RepositoryResult<Option<Document>> {
        ctx.run(async {
            Ok(self
                .collections
                .read()
                .await
                .get(collection)
                .and_then(|docs| docs.iter().find(|doc| filter.matches(&doc.body)))
                .cloned())
        })
        .await
    }

    async fn find_by_id(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
    ) -> RepositoryResult<Option<Document>> {
        ctx.run(async {
            Ok(self
                .collections
                .read()
                .await
                .get(collection)
                .and_then(|docs| docs.iter().find(|doc| doc.id == id))
                .cloned())
        })
        .await
    }

    async fn update(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
        patch: Value,
    ) -> RepositoryResult<bool> {
        ctx.run(async {
            let mut collections = self.collections.write().await;
            let document = collections
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id));
            match document {
                Some(document) => {
                    merge_patch(&mut document.body, &patch);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    async fn update_many(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> RepositoryResult<u64> {
        ctx.run(async {
            let mut collections = self.collections.write().await;
            let mut changed = 0;
            if let Some(documents) = collections.get_mut(collection) {
                for document in documents.iter_mut().filter(|doc| filter.matches(&doc.body)) {
                    merge_patch(&mut document.body, &patch);
                    changed += 1;
                }
            }
            Ok(changed)
        })
        .await
    }

    async fn delete(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
    ) -> RepositoryResult<bool> {
        ctx.run(async {
            let mut collections = self.collections.write().await;
            let Some(documents) = collections.get_mut(collection) else {
                return Ok(false);
            };
            let before = documents.len();
            documents.retain(|doc| doc.id != id);
            Ok(documents.len() < before)
        })
        .await
    }

    async fn count(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
    ) -> RepositoryResult<u64> {
        ctx.run(async {
            let count = self
                .collections
                .read()
                .await
                .get(collection)
                .map(|docs| docs.iter().filter(|doc| filter.matches(&doc.body)).count())
                .unwrap_or(0);
            Ok(count as u64)
        })
        .await
    }

    async fn delete_cascading(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
        cascade: Cascade,
    ) -> RepositoryResult<u64> {
        ctx.run(async {
            let mut collections = self.collections.write().await;
            let mut changed = 0;
            if let Some(dependents) = collections.get_mut(&cascade.collection) {
                for document in dependents
                    .iter_mut()
                    .filter(|doc| cascade.filter.matches(&doc.body))
                {
                    merge_patch(&mut document.body, &cascade.patch);
                    changed += 1;
                }
            }
            if let Some(documents) = collections.get_mut(collection) {
                documents.retain(|doc| doc.id != id);
            }
            Ok(changed)
        })
        .await
    }
}
