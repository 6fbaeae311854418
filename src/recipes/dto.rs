use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::repo_types::Recipe;
use crate::attributes::repo_types::Attribute;

/// A tag or ingredient reference in a recipe payload: `"Quick"` or `{"name": "Quick"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameRef {
    Plain(String),
    Named { name: String },
}

impl NameRef {
    pub fn into_name(self) -> String {
        match self {
            NameRef::Plain(name) | NameRef::Named { name } => name,
        }
    }
}

/// Body for `POST /recipe/recipes/` and `PUT /recipe/recipes/{id}/`.
///
/// `time_minutes` and `price` stay raw JSON until validation so a wrong type
/// is reported on the field instead of failing the whole body.
#[derive(Debug, Deserialize, Validate)]
pub struct RecipeRequest {
    #[validate(
        required(message = "This field is required."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub title: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub time_minutes: Option<Value>,
    #[validate(required(message = "This field is required."))]
    pub price: Option<Value>,
    pub description: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: Option<String>,
    pub tags: Option<Vec<NameRef>>,
    pub ingredients: Option<Vec<NameRef>>,
}

/// Body for `PATCH /recipe/recipes/{id}/`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RecipePatch {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub title: Option<String>,
    pub time_minutes: Option<Value>,
    pub price: Option<Value>,
    pub description: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: Option<String>,
    pub tags: Option<Vec<NameRef>>,
    pub ingredients: Option<Vec<NameRef>>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// List representation.
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.row.id,
            title: recipe.row.title,
            time_minutes: recipe.row.time_minutes,
            price: recipe.row.price,
            link: recipe.row.link,
            tags: recipe.tags,
            ingredients: recipe.ingredients,
        }
    }
}

/// Detail representation; `image` is a short-lived download URL.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: i64,
    pub image: Option<String>,
}
