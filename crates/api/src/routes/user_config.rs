use axum::routing::get;
use axum::Router;

use crate::handlers::user_config;
use crate::state::AppState;

/// Routes mounted at `/config`.
///
/// ```text
/// GET  /  -> get_config
/// PUT  /  -> update_config
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(user_config::get_config).put(user_config::update_config),
    )
}
