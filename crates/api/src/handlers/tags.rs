//! Handlers for tags.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use doit_core::types::DbId;
use doit_db::models::tag::CreateTag;
use doit_db::repositories::TagRepo;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/tags
pub async fn list_tags(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tags = TagRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: tags }))
}

/// POST /api/v1/tags
pub async fn create_tag(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTag>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let tag = state
        .tags
        .create(auth.user_id, &input.into_entity(auth.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: tag })))
}

/// DELETE /api/v1/tags/{id}
pub async fn delete_tag(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.tags.delete(auth.user_id, id).await?;
    tracing::info!(tag_id = id, user_id = auth.user_id, "Tag deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/tags/{id}/toggle-status
pub async fn toggle_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let tag = state.tags.toggle_status(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: tag }))
}
