//! Handlers for the caller's settings.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use doit_db::models::user_config::UpsertUserConfig;
use doit_db::repositories::UserConfigRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/config
///
/// Returns 204 if the caller has not saved settings yet.
pub async fn get_config(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let config = UserConfigRepo::find_by_user(&state.pool, auth.user_id).await?;

    match config {
        Some(c) => Ok(Json(DataResponse { data: c }).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// PUT /api/v1/config
///
/// Replace the caller's settings object.
pub async fn update_config(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpsertUserConfig>,
) -> AppResult<impl IntoResponse> {
    let config = UserConfigRepo::upsert(&state.pool, auth.user_id, &input).await?;

    tracing::info!(
        user_id = auth.user_id,
        keys = input.properties.len(),
        "User config updated"
    );

    Ok(Json(DataResponse { data: config }))
}
