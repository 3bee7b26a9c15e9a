use axum::routing::{get, post};
use axum::Router;

use crate::handlers::todo_items;
use crate::state::AppState;

/// Routes mounted at `/todo-items`.
///
/// ```text
/// GET    /                      -> list_items
/// POST   /                      -> create_item
/// GET    /{id}                  -> get_item
/// PUT    /{id}                  -> update_item
/// DELETE /{id}                  -> delete_item
/// POST   /{id}/toggle-status    -> toggle_status
/// GET    /{id}/dependencies     -> list_dependencies
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(todo_items::list_items).post(todo_items::create_item))
        .route(
            "/{id}",
            get(todo_items::get_item)
                .put(todo_items::update_item)
                .delete(todo_items::delete_item),
        )
        .route("/{id}/toggle-status", post(todo_items::toggle_status))
        .route("/{id}/dependencies", get(todo_items::list_dependencies))
}
