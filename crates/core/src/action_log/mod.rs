//! Action log: an append-only change journal with per-entity undo/redo.
//!
//! Every (owner, entity type, entity id) triple is an independent timeline,
//! the [`StackKey`]. Its records form two virtual stacks over one table:
//!
//! - **active**: `undone_at IS NULL AND NOT is_compacted`, head is the most
//!   recent by `occurred_at` (ties broken by id).
//! - **redo**: `undone_at IS NOT NULL AND NOT is_compacted`, head is the
//!   earliest by `undone_at`.
//!
//! Compacted records are read-only history and never returned by undo/redo.

pub mod changes;
pub mod compaction;
pub mod describe;
pub mod record;
pub mod service;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

pub use changes::{ChangeSet, FieldChange, FieldValue, ENTITY_KEY};
pub use record::{ActionLog, CompactionPlan, CompactionReport, NewActionLog, UndoRedoState};
pub use service::{ActionLogConfig, ActionLogService};
pub use store::ActionLogStore;

/// Default ceiling of active (undoable) records per stack.
pub const DEFAULT_MAX_UNDOABLE_ACTIONS: i64 = 100;

/// Default age after which active records are compacted.
pub const DEFAULT_COMPACTION_AGE_DAYS: i64 = 7;

/// Default number of history rows returned.
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// Entity type discriminators written by this application.
///
/// The column is an open string: other kinds may be journaled too.
pub mod entity_types {
    pub const TODO_ITEM: &str = "TodoItem";
    pub const PERSON: &str = "Person";
    pub const TAG: &str = "Tag";
    pub const NOTE: &str = "Note";
    pub const DEPENDENCY: &str = "Dependency";
}

/// Kind of user action a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

impl ActionType {
    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Create" => Ok(Self::Create),
            "Update" => Ok(Self::Update),
            "Delete" => Ok(Self::Delete),
            other => Err(CoreError::Internal(format!("Unknown action type '{other}'"))),
        }
    }
}

/// Identifies one independent undo/redo timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackKey {
    pub user_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
}

impl StackKey {
    pub fn new(user_id: DbId, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        Self {
            user_id,
            entity_type: entity_type.into(),
            entity_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_round_trips_through_str() {
        for action in [ActionType::Create, ActionType::Update, ActionType::Delete] {
            assert_eq!(action.as_str().parse::<ActionType>().unwrap(), action);
        }
        assert!("Rename".parse::<ActionType>().is_err());
    }

    #[test]
    fn action_type_serializes_as_name() {
        let json = serde_json::to_string(&ActionType::Delete).unwrap();
        assert_eq!(json, "\"Delete\"");
    }
}
