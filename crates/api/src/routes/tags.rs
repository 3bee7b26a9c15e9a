use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::tags;
use crate::state::AppState;

/// Routes mounted at `/tags`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tags::list_tags).post(tags::create_tag))
        .route("/{id}", delete(tags::delete_tag))
        .route("/{id}/toggle-status", post(tags::toggle_status))
}
