use rust_decimal::Decimal;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::attributes::repo_types::Attribute;

/// `recipes` row without its associations.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>, // object key in the image bucket
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct Recipe {
    pub row: RecipeRow,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// `None` keeps the current value; `Some` association lists replace the old set.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

/// Recipes linked to any listed tag and any listed ingredient; empty lists don't filter.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}
