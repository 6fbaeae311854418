use validator::Validate;

use super::{
    dto::{NameRef, RecipePatch, RecipeRequest},
    repo_types::{NewRecipe, RecipeChanges},
};
use crate::{
    error::{AppError, FieldErrors},
    validation::{check_names, check_price, money, parse_decimal, parse_integer, reject_blank},
};

fn names(refs: Option<Vec<NameRef>>) -> Option<Vec<String>> {
    refs.map(|list| {
        list.into_iter()
            .map(|r| r.into_name().trim().to_string())
            .collect()
    })
}

fn check_common(
    errors: &mut FieldErrors,
    title: Option<&str>,
    price: Option<&rust_decimal::Decimal>,
    tags: Option<&[String]>,
    ingredients: Option<&[String]>,
) {
    reject_blank(errors, "title", title);
    check_price(errors, "price", price);
    if let Some(tags) = tags {
        check_names(errors, "tags", tags);
    }
    if let Some(ingredients) = ingredients {
        check_names(errors, "ingredients", ingredients);
    }
}

/// Validates a full payload; every failure is reported before anything is written.
pub fn validate_new(req: RecipeRequest) -> Result<NewRecipe, AppError> {
    let mut errors = req.validate().err().map(FieldErrors::from).unwrap_or_default();
    let time_minutes = parse_integer(&mut errors, "time_minutes", req.time_minutes.as_ref());
    let price = parse_decimal(&mut errors, "price", req.price.as_ref());
    let tags = names(req.tags);
    let ingredients = names(req.ingredients);
    check_common(
        &mut errors,
        req.title.as_deref(),
        price.as_ref(),
        tags.as_deref(),
        ingredients.as_deref(),
    );
    errors.into_result()?;

    match (req.title, time_minutes, price) {
        (Some(title), Some(time_minutes), Some(price)) => Ok(NewRecipe {
            title: title.trim().to_string(),
            description: req.description.unwrap_or_default(),
            time_minutes,
            price: money(price),
            link: req.link.map(|l| l.trim().to_string()).unwrap_or_default(),
            tags: tags.unwrap_or_default(),
            ingredients: ingredients.unwrap_or_default(),
        }),
        _ => Err(AppError::BadRequest("title, time_minutes and price are required".into())),
    }
}

/// PUT replaces the required fields; optional ones and the association lists
/// change only when present in the body.
pub fn validate_replace(req: RecipeRequest) -> Result<RecipeChanges, AppError> {
    let description_present = req.description.is_some();
    let link_present = req.link.is_some();
    let tags_present = req.tags.is_some();
    let ingredients_present = req.ingredients.is_some();
    let new = validate_new(req)?;
    Ok(RecipeChanges {
        title: Some(new.title),
        description: description_present.then_some(new.description),
        time_minutes: Some(new.time_minutes),
        price: Some(new.price),
        link: link_present.then_some(new.link),
        tags: tags_present.then_some(new.tags),
        ingredients: ingredients_present.then_some(new.ingredients),
    })
}

pub fn validate_patch(req: RecipePatch) -> Result<RecipeChanges, AppError> {
    let mut errors = req.validate().err().map(FieldErrors::from).unwrap_or_default();
    let time_minutes = parse_integer(&mut errors, "time_minutes", req.time_minutes.as_ref());
    let price = parse_decimal(&mut errors, "price", req.price.as_ref());
    let tags = names(req.tags);
    let ingredients = names(req.ingredients);
    check_common(
        &mut errors,
        req.title.as_deref(),
        price.as_ref(),
        tags.as_deref(),
        ingredients.as_deref(),
    );
    errors.into_result()?;

    Ok(RecipeChanges {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        time_minutes,
        price: price.map(money),
        link: req.link.map(|l| l.trim().to_string()),
        tags,
        ingredients,
    })
}
