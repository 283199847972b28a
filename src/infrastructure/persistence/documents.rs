use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::AnyRow;
use sqlx::Row;

use crate::domain::context::OpContext;
use crate::domain::entities::ResourceId;
use crate::domain::errors::{RepositoryError, RepositoryResult};
use crate::domain::ports::{Cascade, Document, DocumentStore, Filter, Query, SortOrder};
use crate::infrastructure::persistence::Database;

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        metrics::counter!("hackhub_store_failures_total").increment(1);
        RepositoryError::StoreFailure(err.to_string())
    }
}

/// JSON path for a top-level field. Field names are inlined into the SQL so the
/// expression indexes apply, which is why only identifier-like names are accepted.
fn json_path(field: &str) -> RepositoryResult<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(format!("'$.\"{}\"'", field))
    } else {
        Err(RepositoryError::StoreFailure(format!(
            "invalid field name {:?}",
            field
        )))
    }
}

/// `WHERE` clause for `collection` and `filter`, plus the JSON-encoded values to
/// bind after the collection name.
fn where_clause(filter: &Filter) -> RepositoryResult<(String, Vec<String>)> {
    let mut sql = String::from("collection = ?");
    let mut values = Vec::with_capacity(filter.conditions().len());
    for (field, value) in filter.conditions() {
        sql.push_str(&format!(
            " AND json_extract(body, {}) = json_extract(?, '$')",
            json_path(field)?
        ));
        values.push(serde_json::to_string(value)?);
    }
    Ok((sql, values))
}

fn decode(row: AnyRow) -> RepositoryResult<Document> {
    let id: String = row.try_get("id")?;
    let body: String = row.try_get("body")?;
    let id = id
        .parse()
        .map_err(|e| RepositoryError::StoreFailure(format!("corrupt document id: {}", e)))?;
    Ok(Document {
        id,
        body: serde_json::from_str(&body)?,
    })
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl DocumentStore for Database {
    async fn insert(
        &self,
        ctx: &OpContext,
        collection: &str,
        body: Value,
    ) -> RepositoryResult<ResourceId> {
        let id = ResourceId::new();
        let body = serde_json::to_string(&body)?;
        ctx.run(async {
            sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
                .bind(collection)
                .bind(id.to_string())
                .bind(body)
                .execute(&self.pool)
                .await?;
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
        let (clause, values) = where_clause(&query.filter)?;
        let order = match &query.sort {
            Some(sort) => {
                let direction = match sort.order {
                    SortOrder::Ascending => "ASC",
                    SortOrder::Descending => "DESC",
                };
                format!(
                    "json_extract(body, {path}) {dir}, seq {dir}",
                    path = json_path(&sort.field)?,
                    dir = direction
                )
            }
            None => "seq ASC".to_string(),
        };
        let sql = format!(
            "SELECT id, body FROM documents WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            clause, order
        );

        ctx.run(async {
            let mut statement = sqlx::query(&sql).bind(collection);
            for value in &values {
                statement = statement.bind(value.as_str());
            }
            let rows = statement
                .bind(query.limit.map(to_i64).unwrap_or(-1))
                .bind(to_i64(query.skip))
                .fetch_all(&self.pool)
                .await?;
            rows.into_iter().map(decode).collect()
        })
        .await
    }

    async fn find_one(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
    ) -> RepositoryResult<Option<Document>> {
        let query = Query {
            filter: filter.clone(),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.find(ctx, collection, &query).await?.into_iter().next())
    }

    async fn find_by_id(
        &self,
        ctx: &OpContext,
        collection: &str,
        id: ResourceId,
    ) -> RepositoryResult<Option<Document>> {
        ctx.run(async {
            let row = sqlx::query("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
            row.map(decode).transpose()
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
        let patch = serde_json::to_string(&patch)?;
        ctx.run(async {
            let result = sqlx::query(
                "UPDATE documents SET body = json_patch(body, ?) WHERE collection = ? AND id = ?",
            )
            .bind(patch)
            .bind(collection)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
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
        let (clause, values) = where_clause(filter)?;
        let patch = serde_json::to_string(&patch)?;
        let sql = format!(
            "UPDATE documents SET body = json_patch(body, ?) WHERE {}",
            clause
        );

        ctx.run(async {
            let mut statement = sqlx::query(&sql).bind(patch).bind(collection);
            for value in &values {
                statement = statement.bind(value.as_str());
            }
            let result = statement.execute(&self.pool).await?;
            Ok(result.rows_affected())
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
            let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn count(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: &Filter,
    ) -> RepositoryResult<u64> {
        let (clause, values) = where_clause(filter)?;
        let sql = format!("SELECT COUNT(*) AS total FROM documents WHERE {}", clause);

        ctx.run(async {
            let mut statement = sqlx::query(&sql).bind(collection);
            for value in &values {
                statement = statement.bind(value.as_str());
            }
            let row = statement.fetch_one(&self.pool).await?;
            let total: i64 = row.try_get("total")?;
            Ok(u64::try_from(total).unwrap_or_default())
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
        let (clause, values) = where_clause(&cascade.filter)?;
        let patch = serde_json::to_string(&cascade.patch)?;
        let sql = format!(
            "UPDATE documents SET body = json_patch(body, ?) WHERE {}",
            clause
        );

        // Dropping the transaction on cancellation rolls both statements back.
        ctx.run(async {
            let mut tx = self.pool.begin().await?;

            let mut statement = sqlx::query(&sql).bind(patch).bind(cascade.collection.as_str());
            for value in &values {
                statement = statement.bind(value.as_str());
            }
            let changed = statement.execute(&mut *tx).await?.rows_affected();

            sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(changed)
        })
        .await
    }
}
