//! Handlers for dependencies between todo items.
//!
//! Dependencies carry no owner column; access is granted through the
//! demanding todo item.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use doit_core::action_log::entity_types;
use doit_core::error::CoreError;
use doit_core::types::DbId;
use doit_db::models::dependency::CreateDependency;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/dependencies
pub async fn create_dependency(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateDependency>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if input.demanding_id == input.required_id {
        return Err(AppError::Core(CoreError::Validation(
            "A todo item cannot depend on itself".into(),
        )));
    }
    state.todo_items.get(auth.user_id, input.demanding_id).await?;
    state.todo_items.get(auth.user_id, input.required_id).await?;

    let dep = state
        .dependencies
        .create(auth.user_id, &input.into_entity())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: dep })))
}

/// DELETE /api/v1/dependencies/{id}
pub async fn delete_dependency(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let dep = state.dependencies.get(auth.user_id, id).await?;
    // Hide dependencies of other users' items.
    match state.todo_items.get(auth.user_id, dep.demanding_id).await {
        Err(CoreError::NotFound { .. }) => {
            return Err(AppError::Core(CoreError::NotFound {
                entity: entity_types::DEPENDENCY,
                id,
            }));
        }
        other => {
            other?;
        }
    }

    state.dependencies.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
