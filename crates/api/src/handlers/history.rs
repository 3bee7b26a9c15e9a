//! Handlers for action log history and undo/redo.
//!
//! `entity_type` path segments are the stored discriminators (`TodoItem`,
//! `Person`, ...). Undo and redo answer `200` with `applied: false` when the
//! stack has nothing eligible.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use doit_core::types::DbId;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::HistoryParams;
use crate::response::{DataResponse, ReplayResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearedRedo {
    pub cleared: u64,
}

/// GET /api/v1/history/{entity_type}/{entity_id}
///
/// All owners' records for the entity, newest first.
pub async fn get_history(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, DbId)>,
    Query(params): Query<HistoryParams>,
) -> AppResult<impl IntoResponse> {
    state.journal(&entity_type)?;
    let records = state
        .action_log
        .history(&entity_type, entity_id, params.include_undone(), params.limit())
        .await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/history/{entity_type}/{entity_id}/state
pub async fn get_state(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    state.journal(&entity_type)?;
    let undo_state = state
        .action_log
        .undo_redo_state(auth.user_id, &entity_type, entity_id)
        .await?;
    Ok(Json(DataResponse { data: undo_state }))
}

/// POST /api/v1/history/{entity_type}/{entity_id}/undo
pub async fn undo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let journal = state.journal(&entity_type)?;
    let outcome = journal.undo(auth.user_id, entity_id).await?;

    tracing::info!(
        user_id = auth.user_id,
        entity_type = %entity_type,
        entity_id,
        applied = outcome.is_applied(),
        "Undo requested"
    );

    Ok(Json(DataResponse {
        data: ReplayResponse::from(outcome),
    }))
}

/// POST /api/v1/history/{entity_type}/{entity_id}/redo
pub async fn redo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let journal = state.journal(&entity_type)?;
    let outcome = journal.redo(auth.user_id, entity_id).await?;

    tracing::info!(
        user_id = auth.user_id,
        entity_type = %entity_type,
        entity_id,
        applied = outcome.is_applied(),
        "Redo requested"
    );

    Ok(Json(DataResponse {
        data: ReplayResponse::from(outcome),
    }))
}

/// DELETE /api/v1/history/{entity_type}/{entity_id}/redo
///
/// Discard the caller's redo stack for the entity.
pub async fn clear_redo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    state.journal(&entity_type)?;
    let cleared = state
        .action_log
        .clear_redo_stack(auth.user_id, &entity_type, entity_id)
        .await?;
    Ok(Json(DataResponse {
        data: ClearedRedo { cleared },
    }))
}

/// POST /api/v1/history/compact
///
/// Compact the caller's stale history now instead of waiting for the sweep.
pub async fn compact(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let report = state.action_log.compact_old_actions(auth.user_id).await?;
    Ok(Json(DataResponse { data: report }))
}
