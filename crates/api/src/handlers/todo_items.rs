//! Handlers for todo items.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use doit_core::types::DbId;
use doit_db::models::dependency::Dependency;
use doit_db::models::todo_item::{CreateTodoItem, DueState, TodoItem, UpdateTodoItem};
use doit_db::repositories::{DependencyRepo, TodoItemRepo};
use serde::Serialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// A todo item with its due state as of today (UTC).
#[derive(Debug, Serialize)]
pub struct TodoItemView {
    #[serde(flatten)]
    pub item: TodoItem,
    pub due_state: DueState,
}

impl From<TodoItem> for TodoItemView {
    fn from(item: TodoItem) -> Self {
        let due_state = item.due_state(Utc::now().date_naive());
        Self { item, due_state }
    }
}

/// Author and contact must be persons the caller can see.
async fn check_persons(state: &AppState, user_id: DbId, ids: [Option<DbId>; 2]) -> AppResult<()> {
    for id in ids.into_iter().flatten() {
        state.persons.get(user_id, id).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/todo-items
pub async fn list_items(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let items: Vec<TodoItemView> = TodoItemRepo::list_for_user(&state.pool, auth.user_id)
        .await?
        .into_iter()
        .map(TodoItemView::from)
        .collect();
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/todo-items
pub async fn create_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTodoItem>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_persons(&state, auth.user_id, [Some(input.author_id), Some(input.contact_id)]).await?;

    let item = state
        .todo_items
        .create(auth.user_id, &input.into_entity(auth.user_id))
        .await?;

    tracing::info!(todo_item_id = item.id, user_id = auth.user_id, "Todo item created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TodoItemView::from(item),
        }),
    ))
}

/// GET /api/v1/todo-items/{id}
pub async fn get_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let item = state.todo_items.get(auth.user_id, id).await?;
    Ok(Json(DataResponse {
        data: TodoItemView::from(item),
    }))
}

/// PUT /api/v1/todo-items/{id}
pub async fn update_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTodoItem>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_persons(&state, auth.user_id, [input.author_id, input.contact_id]).await?;

    let item = state
        .todo_items
        .update(auth.user_id, id, move |item| input.apply_to(item))
        .await?;

    Ok(Json(DataResponse {
        data: TodoItemView::from(item),
    }))
}

/// DELETE /api/v1/todo-items/{id}
pub async fn delete_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.todo_items.delete(auth.user_id, id).await?;
    tracing::info!(todo_item_id = id, user_id = auth.user_id, "Todo item deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/todo-items/{id}/toggle-status
pub async fn toggle_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let item = state.todo_items.toggle_status(auth.user_id, id).await?;
    Ok(Json(DataResponse {
        data: TodoItemView::from(item),
    }))
}

/// GET /api/v1/todo-items/{id}/dependencies
///
/// Dependencies in which the item takes part on either side.
pub async fn list_dependencies(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.todo_items.get(auth.user_id, id).await?;
    let deps: Vec<Dependency> = DependencyRepo::list_for_item(&state.pool, id).await?;
    Ok(Json(DataResponse { data: deps }))
}
