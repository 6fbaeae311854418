use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeRow};
use crate::{
    attributes::{
        repo::upsert_tx,
        repo_types::{Attribute, AttributeKind},
    },
    error::AppError,
};

const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, time_minutes, price, link, image, created_at";

/// Every method takes the owner and filters on it; a recipe owned by someone
/// else behaves exactly like a missing one.
#[async_trait]
pub trait RecipeRepo: Send + Sync {
    /// Newest first (id descending).
    async fn list(&self, owner: Uuid, filter: &RecipeFilter) -> Result<Vec<Recipe>, AppError>;
    async fn get(&self, owner: Uuid, id: i64) -> Result<Option<Recipe>, AppError>;
    /// Inserts the recipe and get-or-creates its tags and ingredients atomically.
    async fn create(&self, owner: Uuid, new: NewRecipe) -> Result<Recipe, AppError>;
    async fn update(&self, owner: Uuid, id: i64, changes: RecipeChanges) -> Result<Option<Recipe>, AppError>;
    /// Returns the removed row so the caller can drop its image.
    async fn delete(&self, owner: Uuid, id: i64) -> Result<Option<RecipeRow>, AppError>;
    /// Stores the image key; yields the updated recipe and the replaced key.
    async fn set_image(&self, owner: Uuid, id: i64, key: &str) -> Result<Option<(Recipe, Option<String>)>, AppError>;
    async fn image_keys(&self, owner: Uuid) -> Result<Vec<String>, AppError>;
}

pub struct PgRecipeRepo {
    pool: PgPool,
}

impl PgRecipeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attributes_for(
        &self,
        kind: AttributeKind,
        recipe_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Attribute>>, AppError> {
        let rows = sqlx::query_as::<_, (i64, i64, String)>(&format!(
            r#"
            SELECT l.recipe_id, a.id, a.name
              FROM {link} l
              JOIN {table} a ON a.id = l.{col}
             WHERE l.recipe_id = ANY($1)
             ORDER BY a.id ASC
            "#,
            link = kind.link_table(),
            table = kind.table(),
            col = kind.link_column(),
        ))
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<Attribute>> = HashMap::new();
        for (recipe_id, id, name) in rows {
            grouped.entry(recipe_id).or_default().push(Attribute { id, name });
        }
        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<RecipeRow>) -> Result<Vec<Recipe>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.attributes_for(AttributeKind::Tag, &ids).await?;
        let mut ingredients = self.attributes_for(AttributeKind::Ingredient, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| Recipe {
                tags: tags.remove(&row.id).unwrap_or_default(),
                ingredients: ingredients.remove(&row.id).unwrap_or_default(),
                row,
            })
            .collect())
    }
}

/// Replaces the recipe's links of `kind` with `names`, creating missing ones.
async fn relink_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: AttributeKind,
    owner: Uuid,
    recipe_id: i64,
    names: &[String],
) -> Result<(), AppError> {
    sqlx::query(&format!("DELETE FROM {} WHERE recipe_id = $1", kind.link_table()))
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    for name in dedup(names) {
        let attribute_id = upsert_tx(tx, kind, owner, name).await?;
        sqlx::query(&format!(
            "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.link_table(),
            kind.link_column()
        ))
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Order-preserving; the first spelling wins.
pub(crate) fn dedup(names: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .filter(|n| seen.insert(*n))
        .collect()
}

#[async_trait]
impl RecipeRepo for PgRecipeRepo {
    async fn list(&self, owner: Uuid, filter: &RecipeFilter) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            SELECT {RECIPE_COLUMNS}
              FROM recipes r
             WHERE r.user_id = $1
               AND (cardinality($2::bigint[]) = 0 OR EXISTS (
                    SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
               AND (cardinality($3::bigint[]) = 0 OR EXISTS (
                    SELECT 1 FROM recipe_ingredients ri WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
             ORDER BY r.id DESC
            "#
        ))
        .bind(owner)
        .bind(&filter.tags)
        .bind(&filter.ingredients)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn get(&self, owner: Uuid, id: i64) -> Result<Option<Recipe>, AppError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create(&self, owner: Uuid, new: NewRecipe) -> Result<Recipe, AppError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            INSERT INTO recipes (user_id, title, description, time_minutes, price, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.time_minutes)
        .bind(new.price)
        .bind(&new.link)
        .fetch_one(&mut *tx)
        .await?;

        relink_tx(&mut tx, AttributeKind::Tag, owner, row.id, &new.tags).await?;
        relink_tx(&mut tx, AttributeKind::Ingredient, owner, row.id, &new.ingredients).await?;
        tx.commit().await?;

        self.get(owner, row.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("recipe {} vanished after insert", row.id)))
    }

    async fn update(&self, owner: Uuid, id: i64, changes: RecipeChanges) -> Result<Option<Recipe>, AppError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE recipes
               SET title        = COALESCE($3, title),
                   description  = COALESCE($4, description),
                   time_minutes = COALESCE($5, time_minutes),
                   price        = COALESCE($6, price),
                   link         = COALESCE($7, link)
             WHERE id = $1 AND user_id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.time_minutes)
        .bind(changes.price)
        .bind(changes.link)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }
        if let Some(tags) = &changes.tags {
            relink_tx(&mut tx, AttributeKind::Tag, owner, id, tags).await?;
        }
        if let Some(ingredients) = &changes.ingredients {
            relink_tx(&mut tx, AttributeKind::Ingredient, owner, id, ingredients).await?;
        }
        tx.commit().await?;

        self.get(owner, id).await
    }

    async fn delete(&self, owner: Uuid, id: i64) -> Result<Option<RecipeRow>, AppError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_image(&self, owner: Uuid, id: i64, key: &str) -> Result<Option<(Recipe, Option<String>)>, AppError> {
        let mut tx = self.pool.begin().await?;
        let previous = sqlx::query_as::<_, (Option<String>,)>(
            "SELECT image FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((previous,)) = previous else {
            return Ok(None);
        };

        sqlx::query("UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .bind(key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(self.get(owner, id).await?.map(|recipe| (recipe, previous)))
    }

    async fn image_keys(&self, owner: Uuid) -> Result<Vec<String>, AppError> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT image FROM recipes WHERE user_id = $1 AND image IS NOT NULL",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }
}
