//! Handlers for persons (the caller's contact list).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use doit_core::types::DbId;
use doit_db::models::person::{CreatePerson, UpdatePerson};
use doit_db::repositories::PersonRepo;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/persons
pub async fn list_persons(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let persons = PersonRepo::list_for_owner(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: persons }))
}

/// POST /api/v1/persons
pub async fn create_person(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePerson>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let person = state
        .persons
        .create(auth.user_id, &input.into_entity(auth.user_id))
        .await?;

    tracing::info!(person_id = person.id, user_id = auth.user_id, "Person created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: person })))
}

/// GET /api/v1/persons/{id}
pub async fn get_person(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let person = state.persons.get(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: person }))
}

/// PUT /api/v1/persons/{id}
pub async fn update_person(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePerson>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let person = state
        .persons
        .update(auth.user_id, id, move |person| input.apply_to(person))
        .await?;
    Ok(Json(DataResponse { data: person }))
}

/// DELETE /api/v1/persons/{id}
///
/// Persons linked to a login, or still referenced by todo items or notes,
/// cannot be deleted.
pub async fn delete_person(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.persons.delete(auth.user_id, id).await?;
    tracing::info!(person_id = id, user_id = auth.user_id, "Person deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/persons/{id}/toggle-status
pub async fn toggle_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let person = state.persons.toggle_status(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: person }))
}
