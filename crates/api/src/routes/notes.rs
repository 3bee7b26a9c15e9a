use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::notes;
use crate::state::AppState;

/// Routes mounted at `/notes`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notes::list_notes).post(notes::create_note))
        .route("/{id}", put(notes::update_note).delete(notes::delete_note))
        .route("/{id}/toggle-status", post(notes::toggle_status))
}
