//! Persistence boundary for action log records.
//!
//! All operations except [`ActionLogStore::list_history`] are scoped by a
//! full [`StackKey`]. History is scoped by entity only, so it shows actions
//! from every owner that touched a shared entity.

use async_trait::async_trait;

use crate::action_log::{ActionLog, ChangeSet, CompactionPlan, NewActionLog, StackKey};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

#[async_trait]
pub trait ActionLogStore: Send + Sync {
    /// Append a record and return it with its assigned id.
    async fn append(&self, entry: NewActionLog) -> Result<ActionLog, CoreError>;

    /// Most recent active record of the stack.
    async fn find_active_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError>;

    /// Earliest undone, non-compacted record of the stack.
    async fn find_redo_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError>;

    /// Atomically stamp the active head with `undone_at` and return it as
    /// stamped.
    async fn pop_active_head(
        &self,
        key: &StackKey,
        undone_at: Timestamp,
    ) -> Result<Option<ActionLog>, CoreError>;

    /// Atomically clear `undone_at` on the redo head and return it as it
    /// stood on the redo stack (still carrying its `undone_at`).
    async fn pop_redo_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError>;

    /// Set or clear `undone_at` on one record.
    async fn set_undone_at(&self, id: DbId, undone_at: Option<Timestamp>)
        -> Result<(), CoreError>;

    async fn count_active(&self, key: &StackKey) -> Result<i64, CoreError>;

    async fn count_redo(&self, key: &StackKey) -> Result<i64, CoreError>;

    /// Replace the stored change set of one record.
    async fn update_changes(&self, id: DbId, changes: &ChangeSet) -> Result<(), CoreError>;

    /// History for an entity across all owners, newest first.
    async fn list_history(
        &self,
        entity_type: &str,
        entity_id: DbId,
        include_undone: bool,
        limit: i64,
    ) -> Result<Vec<ActionLog>, CoreError>;

    /// Delete one record. Returns `false` if it did not exist.
    async fn discard(&self, id: DbId) -> Result<bool, CoreError>;

    /// Delete every undone record of the stack. Returns the number deleted.
    async fn delete_redo(&self, key: &StackKey) -> Result<u64, CoreError>;

    /// Flag the `count` oldest active records of the stack as compacted.
    async fn compact_oldest_active(&self, key: &StackKey, count: i64) -> Result<u64, CoreError>;

    /// Stacks of `user_id` with active records older than `cutoff`.
    async fn list_stale_stacks(
        &self,
        user_id: DbId,
        cutoff: Timestamp,
    ) -> Result<Vec<StackKey>, CoreError>;

    /// Active records of one stack older than `cutoff`, oldest first.
    async fn list_stale_active(
        &self,
        key: &StackKey,
        cutoff: Timestamp,
    ) -> Result<Vec<ActionLog>, CoreError>;

    /// Owners with active records older than `cutoff`.
    async fn list_owners_with_stale(&self, cutoff: Timestamp) -> Result<Vec<DbId>, CoreError>;

    /// Apply a compaction plan for one stack as a single unit of work.
    ///
    /// Fails with `Conflict`, writing nothing, if any planned record is no
    /// longer active (e.g. it was undone after the plan was made).
    async fn apply_compaction(&self, plan: &CompactionPlan) -> Result<(), CoreError>;
}
