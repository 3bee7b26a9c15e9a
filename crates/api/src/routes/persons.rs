use axum::routing::{get, post};
use axum::Router;

use crate::handlers::persons;
use crate::state::AppState;

/// Routes mounted at `/persons`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(persons::list_persons).post(persons::create_person))
        .route(
            "/{id}",
            get(persons::get_person)
                .put(persons::update_person)
                .delete(persons::delete_person),
        )
        .route("/{id}/toggle-status", post(persons::toggle_status))
}
