//! Action log row model.

use doit_core::action_log::{ActionLog, ChangeSet};
use doit_core::error::CoreError;
use doit_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `action_logs` table, before its payload is decoded.
#[derive(Debug, Clone, FromRow)]
pub struct ActionLogRow {
    pub id: DbId,
    pub user_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action_type: String,
    pub changes: serde_json::Value,
    pub occurred_at: Timestamp,
    pub is_compacted: bool,
    pub undone_at: Option<Timestamp>,
    pub description: Option<String>,
}

impl ActionLogRow {
    /// Decode into the engine's record type.
    ///
    /// An undecodable `changes` payload becomes an empty change set; an
    /// unknown `action_type` is an error.
    pub fn into_action_log(self) -> Result<ActionLog, CoreError> {
        Ok(ActionLog {
            id: self.id,
            user_id: self.user_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action_type: self.action_type.parse()?,
            changes: ChangeSet::from_json(&self.changes),
            occurred_at: self.occurred_at,
            is_compacted: self.is_compacted,
            undone_at: self.undone_at,
            description: self.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doit_core::action_log::ActionType;

    fn row(action_type: &str, changes: serde_json::Value) -> ActionLogRow {
        ActionLogRow {
            id: 1,
            user_id: 2,
            entity_type: "TodoItem".into(),
            entity_id: 3,
            action_type: action_type.into(),
            changes,
            occurred_at: chrono::Utc::now(),
            is_compacted: false,
            undone_at: None,
            description: None,
        }
    }

    #[test]
    fn decodes_row_payload() {
        let log = row("Update", serde_json::json!({ "Caption": { "old": "A" } }))
            .into_action_log()
            .unwrap();
        assert_eq!(log.action_type, ActionType::Update);
        assert!(log.changes.contains("Caption"));
    }

    #[test]
    fn garbage_payload_decodes_empty() {
        let log = row("Delete", serde_json::json!("garbage"))
            .into_action_log()
            .unwrap();
        assert!(log.changes.is_empty());
    }

    #[test]
    fn unknown_action_type_is_rejected() {
        assert!(row("Merge", serde_json::json!({})).into_action_log().is_err());
    }
}
