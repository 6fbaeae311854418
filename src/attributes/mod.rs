//! Tags and ingredients: owner-scoped names that recipes link to.
//! They are only created through recipe payloads.

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::attribute_routes()
}
