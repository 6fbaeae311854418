use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Attribute, AttributeKind};
use crate::error::{is_unique_violation, AppError};

#[async_trait]
pub trait AttributeRepo: Send + Sync {
    /// Owner's tags or ingredients, name descending.
    async fn list(&self, kind: AttributeKind, owner: Uuid, assigned_only: bool) -> Result<Vec<Attribute>, AppError>;
    async fn get(&self, kind: AttributeKind, owner: Uuid, id: i64) -> Result<Option<Attribute>, AppError>;
    /// Fails with `AppError::Conflict("name")` when the owner already uses `name`.
    async fn rename(&self, kind: AttributeKind, owner: Uuid, id: i64, name: &str) -> Result<Option<Attribute>, AppError>;
    async fn delete(&self, kind: AttributeKind, owner: Uuid, id: i64) -> Result<bool, AppError>;
}

pub struct PgAttributeRepo {
    pool: PgPool,
}

impl PgAttributeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttributeRepo for PgAttributeRepo {
    async fn list(&self, kind: AttributeKind, owner: Uuid, assigned_only: bool) -> Result<Vec<Attribute>, AppError> {
        let rows = sqlx::query_as::<_, Attribute>(&format!(
            r#"
            SELECT a.id, a.name
              FROM {table} a
             WHERE a.user_id = $1
               AND (NOT $2 OR EXISTS (SELECT 1 FROM {link} l WHERE l.{col} = a.id))
             ORDER BY a.name DESC, a.id DESC
            "#,
            table = kind.table(),
            link = kind.link_table(),
            col = kind.link_column(),
        ))
        .bind(owner)
        .bind(assigned_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, kind: AttributeKind, owner: Uuid, id: i64) -> Result<Option<Attribute>, AppError> {
        let row = sqlx::query_as::<_, Attribute>(&format!(
            "SELECT id, name FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn rename(&self, kind: AttributeKind, owner: Uuid, id: i64, name: &str) -> Result<Option<Attribute>, AppError> {
        sqlx::query_as::<_, Attribute>(&format!(
            "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, name",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("name")
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn delete(&self, kind: AttributeKind, owner: Uuid, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Get-or-create by `(owner, name)` inside the caller's transaction.
pub(crate) async fn upsert_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: AttributeKind,
    owner: Uuid,
    name: &str,
) -> Result<i64, AppError> {
    // DO UPDATE (not DO NOTHING) so RETURNING yields the existing row too.
    let id: i64 = sqlx::query_scalar(&format!(
        r#"
        INSERT INTO {} (user_id, name)
        VALUES ($1, $2)
        ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
        kind.table()
    ))
    .bind(owner)
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}
