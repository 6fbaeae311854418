use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Owner-scoped labels attached to recipes. Tags and ingredients share one
/// shape and differ only in the tables backing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttributeKind::Tag => "Tag",
            AttributeKind::Ingredient => "Ingredient",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Attribute {
    pub id: i64,
    pub name: String,
}
