//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope.

use doit_core::action_log::ActionLog;
use doit_core::mutation::ReplayOutcome;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Result of an undo or redo request.
///
/// `applied` is `false` when the stack had nothing eligible; that is a
/// normal answer, not an error.
#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    pub applied: bool,
    /// The replayed record, as it stands after the replay.
    pub action: Option<ActionLog>,
    /// The live entity afterwards; `null` when the replay removed it.
    pub entity: Option<serde_json::Value>,
}

impl From<ReplayOutcome<serde_json::Value>> for ReplayResponse {
    fn from(outcome: ReplayOutcome<serde_json::Value>) -> Self {
        match outcome {
            ReplayOutcome::Applied { action, entity } => Self {
                applied: true,
                action: Some(action),
                entity,
            },
            ReplayOutcome::NothingToUndo | ReplayOutcome::NothingToRedo => Self {
                applied: false,
                action: None,
                entity: None,
            },
        }
    }
}
