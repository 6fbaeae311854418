use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges};
use crate::error::{is_unique_violation, AppError};

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, created_at";

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `AppError::Conflict("email")` when the email is taken.
    async fn insert(&self, new: NewUser) -> Result<User, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError>;
    /// Removes the user; owned recipes, tags and ingredients go with it.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn conflict_on_email(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("email")
    } else {
        AppError::Database(e)
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, new: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.is_active)
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_email)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email         = COALESCE($2, email),
                   name          = COALESCE($3, name),
                   password_hash = COALESCE($4, password_hash),
                   is_staff      = COALESCE($5, is_staff),
                   is_superuser  = COALESCE($6, is_superuser)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.name)
        .bind(changes.password_hash)
        .bind(changes.is_staff)
        .bind(changes.is_superuser)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_on_email)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::recipes::{
        repo::{PgRecipeRepo, RecipeRepo},
        repo_types::NewRecipe,
    };

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: "Test".into(),
            password_hash: "!unusable".into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    fn new_recipe(tags: &[&str], ingredients: &[&str]) -> NewRecipe {
        NewRecipe {
            title: "Stew".into(),
            description: String::new(),
            time_minutes: 30,
            price: Decimal::new(550, 2),
            link: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: ingredients.iter().map(|i| i.to_string()).collect(),
        }
    }

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local Postgres"]
    async fn duplicate_email_is_a_conflict(pool: PgPool) {
        let users = PgUserRepo::new(pool);
        users.insert(new_user("a@example.com")).await.unwrap();
        let err = users.insert(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict("email")));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local Postgres"]
    async fn update_keeps_unset_columns(pool: PgPool) {
        let users = PgUserRepo::new(pool);
        let user = users.insert(new_user("keep@example.com")).await.unwrap();
        let updated = users
            .update(
                user.id,
                UserChanges {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, "keep@example.com");
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL and a local Postgres"]
    async fn deleting_user_cascades_to_owned_rows(pool: PgPool) {
        let users = PgUserRepo::new(pool.clone());
        let recipes = PgRecipeRepo::new(pool.clone());
        let leaving = users.insert(new_user("leaving@example.com")).await.unwrap();
        let staying = users.insert(new_user("staying@example.com")).await.unwrap();
        recipes.create(leaving.id, new_recipe(&["Vegan"], &["Tofu"])).await.unwrap();
        recipes.create(staying.id, new_recipe(&["Vegan"], &[])).await.unwrap();

        assert!(users.delete(leaving.id).await.unwrap());

        assert_eq!(count(&pool, "users").await, 1);
        assert_eq!(count(&pool, "recipes").await, 1);
        assert_eq!(count(&pool, "tags").await, 1);
        assert_eq!(count(&pool, "ingredients").await, 0);
        assert_eq!(count(&pool, "recipe_tags").await, 1);
        assert_eq!(count(&pool, "recipe_ingredients").await, 0);
        assert!(!users.delete(leaving.id).await.unwrap());
    }
}
