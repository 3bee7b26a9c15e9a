//! Handlers for notes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use doit_core::types::DbId;
use doit_db::models::note::{CreateNote, UpdateNote};
use doit_db::repositories::NoteRepo;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// The referenced tag and person must belong to the caller.
async fn check_refs(
    state: &AppState,
    user_id: DbId,
    tag_id: Option<DbId>,
    person_id: Option<DbId>,
) -> AppResult<()> {
    if let Some(tag_id) = tag_id {
        state.tags.get(user_id, tag_id).await?;
    }
    if let Some(person_id) = person_id {
        state.persons.get(user_id, person_id).await?;
    }
    Ok(())
}

/// GET /api/v1/notes
pub async fn list_notes(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let notes = NoteRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: notes }))
}

/// POST /api/v1/notes
pub async fn create_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateNote>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_refs(&state, auth.user_id, Some(input.tag_id), input.person_id).await?;

    let note = state
        .notes
        .create(auth.user_id, &input.into_entity(auth.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: note })))
}

/// PUT /api/v1/notes/{id}
pub async fn update_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateNote>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_refs(&state, auth.user_id, input.tag_id, input.person_id).await?;

    let note = state
        .notes
        .update(auth.user_id, id, move |note| input.apply_to(note))
        .await?;
    Ok(Json(DataResponse { data: note }))
}

/// DELETE /api/v1/notes/{id}
pub async fn delete_note(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.notes.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notes/{id}/toggle-status
pub async fn toggle_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let note = state.notes.toggle_status(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: note }))
}
