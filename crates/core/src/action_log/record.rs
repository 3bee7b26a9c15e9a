//! Action log record types and read models.

use serde::Serialize;

use crate::action_log::{ActionType, ChangeSet, StackKey};
use crate::types::{DbId, Timestamp};

/// One journaled user action on one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionLog {
    pub id: DbId,
    pub user_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action_type: ActionType,
    pub changes: ChangeSet,
    pub occurred_at: Timestamp,
    /// Folded into read-only history; no longer individually undoable.
    pub is_compacted: bool,
    /// `None` while active, the undo time while on the redo stack.
    pub undone_at: Option<Timestamp>,
    pub description: Option<String>,
}

impl ActionLog {
    pub fn stack_key(&self) -> StackKey {
        StackKey::new(self.user_id, self.entity_type.clone(), self.entity_id)
    }

    pub fn is_active(&self) -> bool {
        self.undone_at.is_none() && !self.is_compacted
    }

    pub fn is_redoable(&self) -> bool {
        self.undone_at.is_some() && !self.is_compacted
    }
}

/// An action log record about to be appended. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewActionLog {
    pub user_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action_type: ActionType,
    pub changes: ChangeSet,
    pub occurred_at: Timestamp,
    pub is_compacted: bool,
    pub description: Option<String>,
}

/// Undo/redo availability for one stack, for UI enablement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UndoRedoState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_description: Option<String>,
    pub redo_description: Option<String>,
    pub undo_count: i64,
    pub redo_count: i64,
}

/// The writes needed to compact one stack, applied atomically by the store.
#[derive(Debug, Clone, Default)]
pub struct CompactionPlan {
    /// Records replaced by a merged daily summary.
    pub delete_ids: Vec<DbId>,
    /// Merged summaries to insert (already flagged compacted).
    pub merged: Vec<NewActionLog>,
    /// Lone records flagged compacted in place.
    pub flag_ids: Vec<DbId>,
}

impl CompactionPlan {
    pub fn is_empty(&self) -> bool {
        self.delete_ids.is_empty() && self.merged.is_empty() && self.flag_ids.is_empty()
    }

    /// Ids of the existing records the plan rewrites. All of them must
    /// still be active when the plan is applied.
    pub fn planned_ids(&self) -> Vec<DbId> {
        self.delete_ids.iter().chain(&self.flag_ids).copied().collect()
    }
}

/// Outcome of compacting one owner's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    /// Stacks that had stale records.
    pub stacks: usize,
    /// Stacks whose compaction failed and was skipped.
    pub failed_stacks: usize,
    /// Daily summaries created.
    pub merged_days: usize,
    /// Original records folded into summaries.
    pub merged_records: usize,
    /// Lone records flagged compacted in place.
    pub flagged_records: usize,
}
