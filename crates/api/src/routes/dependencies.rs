use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::dependencies;
use crate::state::AppState;

/// Routes mounted at `/dependencies`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(dependencies::create_dependency))
        .route("/{id}", delete(dependencies::delete_dependency))
}
