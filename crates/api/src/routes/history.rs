use axum::routing::{get, post};
use axum::Router;

use crate::handlers::history;
use crate::state::AppState;

/// Routes mounted at `/history`.
///
/// ```text
/// POST   /compact                              -> compact
/// GET    /{entity_type}/{entity_id}            -> get_history
/// GET    /{entity_type}/{entity_id}/state      -> get_state
/// POST   /{entity_type}/{entity_id}/undo       -> undo
/// POST   /{entity_type}/{entity_id}/redo       -> redo
/// DELETE /{entity_type}/{entity_id}/redo       -> clear_redo
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/compact", post(history::compact))
        .route("/{entity_type}/{entity_id}", get(history::get_history))
        .route("/{entity_type}/{entity_id}/state", get(history::get_state))
        .route("/{entity_type}/{entity_id}/undo", post(history::undo))
        .route(
            "/{entity_type}/{entity_id}/redo",
            post(history::redo).delete(history::clear_redo),
        )
}
