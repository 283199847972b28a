use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::context::OpContext;
use crate::domain::entities::{Record, Resource, ResourceId};
use crate::domain::errors::{RepositoryError, RepositoryResult};
use crate::domain::page::{Page, PageRequest};
use crate::domain::ports::{Document, DocumentStore, Filter, Query, Sort};

/// Typed CRUD over one collection of the document store.
pub struct GenericRepository<T> {
    store: Arc<dyn DocumentStore>,
    _resource: PhantomData<fn() -> T>,
}

impl<T> Clone for GenericRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _resource: PhantomData,
        }
    }
}

impl<T: Resource> GenericRepository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _resource: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn decode(document: Document) -> RepositoryResult<Record<T>> {
        let data = serde_json::from_value(document.body)?;
        Ok(Record::new(document.id, data))
    }

    fn not_found(key: impl std::fmt::Display) -> RepositoryError {
        RepositoryError::NotFound(format!("{} {}", T::COLLECTION, key))
    }

    pub async fn create(&self, ctx: &OpContext, item: &T) -> RepositoryResult<ResourceId> {
        let body = serde_json::to_value(item)?;
        let id = self.store.insert(ctx, T::COLLECTION, body).await?;
        tracing::debug!("Created {} document {}", T::COLLECTION, id);
        Ok(id)
    }

    pub async fn get_by_id(&self, ctx: &OpContext, id: ResourceId) -> RepositoryResult<Record<T>> {
        match self.store.find_by_id(ctx, T::COLLECTION, id).await? {
            Some(document) => Self::decode(document),
            None => Err(Self::not_found(id)),
        }
    }

    /// Lookup on an arbitrary field. When several documents match, the earliest
    /// inserted one wins.
    pub async fn get_by(
        &self,
        ctx: &OpContext,
        field: &str,
        value: Value,
    ) -> RepositoryResult<Record<T>> {
        let filter = Filter::eq(field, value.clone());
        match self.store.find_one(ctx, T::COLLECTION, &filter).await? {
            Some(document) => Self::decode(document),
            None => Err(Self::not_found(format!("with {} = {}", field, value))),
        }
    }

    pub async fn find(&self, ctx: &OpContext) -> RepositoryResult<Vec<Record<T>>> {
        self.find_where(ctx, Filter::all()).await
    }

    pub async fn find_where(
        &self,
        ctx: &OpContext,
        filter: Filter,
    ) -> RepositoryResult<Vec<Record<T>>> {
        self.store
            .find(ctx, T::COLLECTION, &Query::filtered(filter))
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Newest first when the resource has a creation timestamp, insertion order
    /// otherwise. The total is counted separately from the slice.
    pub async fn find_paged(
        &self,
        ctx: &OpContext,
        page: PageRequest,
    ) -> RepositoryResult<Page<Record<T>>> {
        let query = Query {
            filter: Filter::all(),
            sort: T::CREATED_AT_FIELD.map(Sort::descending),
            skip: page.offset(),
            limit: Some(page.limit()),
        };
        let filter = Filter::all();

        let (documents, total) = tokio::try_join!(
            self.store.find(ctx, T::COLLECTION, &query),
            self.store.count(ctx, T::COLLECTION, &filter),
        )?;

        let items = documents
            .into_iter()
            .map(Self::decode)
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok(Page { items, total })
    }

    /// Merge the present fields of `patch` into the stored document.
    pub async fn update(
        &self,
        ctx: &OpContext,
        id: ResourceId,
        patch: &T::Patch,
    ) -> RepositoryResult<()> {
        let patch = serde_json::to_value(patch)?;
        if self.store.update(ctx, T::COLLECTION, id, patch).await? {
            Ok(())
        } else {
            Err(Self::not_found(id))
        }
    }

    /// Deleting an absent id is not an error.
    pub async fn delete(&self, ctx: &OpContext, id: ResourceId) -> RepositoryResult<()> {
        let deleted = self.store.delete(ctx, T::COLLECTION, id).await?;
        if !deleted {
            tracing::debug!("Delete of absent {} document {}", T::COLLECTION, id);
        }
        Ok(())
    }
}
