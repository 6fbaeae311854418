use serde::Deserialize;
use validator::Validate;

use crate::{error::FieldErrors, validation::reject_blank};

/// Body for `PUT`/`PATCH` on a tag or ingredient.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AttributeRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

impl AttributeRequest {
    /// `partial` is false for PUT, where `name` is mandatory.
    pub fn check(&self, partial: bool) -> FieldErrors {
        let mut errors = self.validate().err().map(FieldErrors::from).unwrap_or_default();
        if self.name.is_none() && !partial {
            errors.add("name", "This field is required.");
        }
        reject_blank(&mut errors, "name", self.name.as_deref());
        errors
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AttributeListQuery {
    #[serde(default)]
    pub assigned_only: Option<String>,
}

impl AttributeListQuery {
    pub fn assigned_only(&self) -> bool {
        matches!(
            self.assigned_only.as_deref().map(str::trim),
            Some("1") | Some("true") | Some("True")
        )
    }
}
