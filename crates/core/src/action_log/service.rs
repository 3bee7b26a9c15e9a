//! The undo/redo engine.
//!
//! [`ActionLogService`] owns the stack discipline on top of an
//! [`ActionLogStore`]: it decides which record is undoable or redoable,
//! flips activation state, enforces the active-count ceiling, and compacts
//! old history. It never touches the journaled entities themselves; applying
//! values is the caller's job (see [`crate::mutation`]).

use std::sync::Arc;

use serde::Serialize;

use crate::action_log::compaction::plan_stack;
use crate::action_log::describe::describe;
use crate::action_log::{
    ActionLog, ActionLogStore, ActionType, ChangeSet, CompactionReport, NewActionLog, StackKey,
    UndoRedoState, DEFAULT_COMPACTION_AGE_DAYS, DEFAULT_MAX_UNDOABLE_ACTIONS,
};
use crate::clock::{Clock, SystemClock};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    /// Active records allowed per stack before the oldest are compacted.
    pub max_undoable_actions: i64,
    /// Active records older than this are folded into daily summaries.
    pub compaction_age: chrono::Duration,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            max_undoable_actions: DEFAULT_MAX_UNDOABLE_ACTIONS,
            compaction_age: chrono::Duration::days(DEFAULT_COMPACTION_AGE_DAYS),
        }
    }
}

/// Records actions and manages per-stack undo/redo state.
#[derive(Clone)]
pub struct ActionLogService {
    store: Arc<dyn ActionLogStore>,
    config: ActionLogConfig,
    clock: Arc<dyn Clock>,
}

impl ActionLogService {
    pub fn new(store: Arc<dyn ActionLogStore>, config: ActionLogConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source (tests, replays).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Record a new action on a stack.
    ///
    /// Clears the stack's redo side first, appends the record as active, then
    /// compacts the oldest active records if the ceiling is exceeded.
    pub async fn record(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        action_type: ActionType,
        changes: ChangeSet,
        description: Option<String>,
    ) -> Result<ActionLog, CoreError> {
        let key = StackKey::new(user_id, entity_type, entity_id);
        self.invalidate_redo(&key).await?;
        let action = self
            .append(user_id, entity_type, entity_id, action_type, changes, description)
            .await?;
        self.enforce_action_limit(&key).await?;
        Ok(action)
    }

    async fn invalidate_redo(&self, key: &StackKey) -> Result<(), CoreError> {
        let cleared = self.store.delete_redo(key).await?;
        if cleared > 0 {
            tracing::debug!(
                user_id = key.user_id,
                entity_type = key.entity_type.as_str(),
                entity_id = key.entity_id,
                cleared,
                "Redo stack invalidated"
            );
        }
        Ok(())
    }

    async fn append(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        action_type: ActionType,
        changes: ChangeSet,
        description: Option<String>,
    ) -> Result<ActionLog, CoreError> {
        let description = description.or_else(|| Some(describe(action_type, &changes)));
        let action = self
            .store
            .append(NewActionLog {
                user_id,
                entity_type: entity_type.to_string(),
                entity_id,
                action_type,
                changes,
                occurred_at: self.clock.now(),
                is_compacted: false,
                description,
            })
            .await?;

        tracing::debug!(
            user_id,
            entity_type,
            entity_id,
            action_id = action.id,
            action_type = %action_type,
            "Action recorded"
        );
        Ok(action)
    }

    /// Append a Delete snapshot while leaving the rest of the stack alone.
    ///
    /// The removal it describes has not happened yet. Follow with
    /// [`Self::commit_staged`] once it has, or [`Self::discard`] if it
    /// failed, so a refused delete never costs the user their redo stack.
    pub async fn stage_delete<E: Serialize + Sync>(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        entity: &E,
    ) -> Result<ActionLog, CoreError> {
        self.append(
            user_id,
            entity_type,
            entity_id,
            ActionType::Delete,
            ChangeSet::deleted(entity),
            Some(format!("Deleted {}", entity_type.to_lowercase())),
        )
        .await
    }

    /// Finish a staged record: clear the stack's redo side and enforce the
    /// ceiling, as [`Self::record`] does for ordinary records.
    pub async fn commit_staged(&self, action: &ActionLog) -> Result<(), CoreError> {
        let key = action.stack_key();
        self.invalidate_redo(&key).await?;
        self.enforce_action_limit(&key).await
    }

    /// Record a Create with the full entity snapshot.
    pub async fn record_create<E: Serialize + Sync>(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        entity: &E,
        description: Option<String>,
    ) -> Result<ActionLog, CoreError> {
        let description =
            description.unwrap_or_else(|| format!("Created {}", entity_type.to_lowercase()));
        self.record(
            user_id,
            entity_type,
            entity_id,
            ActionType::Create,
            ChangeSet::created(entity),
            Some(description),
        )
        .await
    }

    /// Record a Delete with the full entity snapshot, so undo can restore it.
    pub async fn record_delete<E: Serialize + Sync>(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        entity: &E,
        description: Option<String>,
    ) -> Result<ActionLog, CoreError> {
        let description =
            description.unwrap_or_else(|| format!("Deleted {}", entity_type.to_lowercase()));
        self.record(
            user_id,
            entity_type,
            entity_id,
            ActionType::Delete,
            ChangeSet::deleted(entity),
            Some(description),
        )
        .await
    }

    async fn enforce_action_limit(&self, key: &StackKey) -> Result<(), CoreError> {
        let active = self.store.count_active(key).await?;
        let excess = active - self.config.max_undoable_actions;
        if excess > 0 {
            let compacted = self.store.compact_oldest_active(key, excess).await?;
            tracing::info!(
                user_id = key.user_id,
                entity_type = key.entity_type.as_str(),
                entity_id = key.entity_id,
                compacted,
                "Action ceiling reached, oldest actions compacted"
            );
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------------

    /// Move the most recent active record onto the redo stack.
    ///
    /// Returns `None` when there is nothing to undo. The caller applies the
    /// reverse change to the live entity.
    pub async fn undo(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Option<ActionLog>, CoreError> {
        let key = StackKey::new(user_id, entity_type, entity_id);
        let action = self.store.pop_active_head(&key, self.clock.now()).await?;
        if let Some(action) = &action {
            tracing::debug!(user_id, entity_type, entity_id, action_id = action.id, "Action undone");
        }
        Ok(action)
    }

    /// Move the earliest undone record back onto the active stack.
    ///
    /// The record keeps its original `occurred_at`, so ordering survives
    /// undo/redo cycles. The returned copy still carries the `undone_at` it
    /// had on the redo stack, so [`Self::revert_redo`] can put it back.
    /// Returns `None` when there is nothing to redo.
    pub async fn redo(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Option<ActionLog>, CoreError> {
        let key = StackKey::new(user_id, entity_type, entity_id);
        let action = self.store.pop_redo_head(&key).await?;
        if let Some(action) = &action {
            tracing::debug!(user_id, entity_type, entity_id, action_id = action.id, "Action redone");
        }
        Ok(action)
    }

    /// Put an undone record back on the active stack.
    ///
    /// Used when the live entity could not take the change, so the stacks
    /// stay consistent with what the user sees.
    pub async fn revert_undo(&self, action: &ActionLog) -> Result<(), CoreError> {
        self.store.set_undone_at(action.id, None).await
    }

    /// Put a redone record back on the redo stack at its old position.
    /// `action` must be the copy returned by [`Self::redo`].
    pub async fn revert_redo(&self, action: &ActionLog) -> Result<(), CoreError> {
        match action.undone_at {
            Some(at) => self.store.set_undone_at(action.id, Some(at)).await,
            None => Ok(()),
        }
    }

    /// Withdraw a record whose mutation did not go through.
    pub async fn discard(&self, action: &ActionLog) -> Result<(), CoreError> {
        if self.store.discard(action.id).await? {
            tracing::debug!(action_id = action.id, "Action record discarded");
        }
        Ok(())
    }

    /// Persist an updated change set (the lazily captured `new` side).
    pub async fn save_changes(&self, action_id: DbId, changes: &ChangeSet) -> Result<(), CoreError> {
        self.store.update_changes(action_id, changes).await
    }

    pub async fn can_undo(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<bool, CoreError> {
        let key = StackKey::new(user_id, entity_type, entity_id);
        Ok(self.store.find_active_head(&key).await?.is_some())
    }

    pub async fn can_redo(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<bool, CoreError> {
        let key = StackKey::new(user_id, entity_type, entity_id);
        Ok(self.store.find_redo_head(&key).await?.is_some())
    }

    /// Delete every undone record of a stack.
    pub async fn clear_redo_stack(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<u64, CoreError> {
        let key = StackKey::new(user_id, entity_type, entity_id);
        self.store.delete_redo(&key).await
    }

    /// Snapshot of undo/redo availability for a stack.
    pub async fn undo_redo_state(
        &self,
        user_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<UndoRedoState, CoreError> {
        let key = StackKey::new(user_id, entity_type, entity_id);
        let undo_head = self.store.find_active_head(&key).await?;
        let redo_head = self.store.find_redo_head(&key).await?;
        let undo_count = self.store.count_active(&key).await?;
        let redo_count = self.store.count_redo(&key).await?;

        Ok(UndoRedoState {
            can_undo: undo_head.is_some(),
            can_redo: redo_head.is_some(),
            undo_description: undo_head.and_then(|a| a.description),
            redo_description: redo_head.and_then(|a| a.description),
            undo_count,
            redo_count,
        })
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Journal of an entity across all owners, newest first.
    pub async fn history(
        &self,
        entity_type: &str,
        entity_id: DbId,
        include_undone: bool,
        limit: i64,
    ) -> Result<Vec<ActionLog>, CoreError> {
        self.store
            .list_history(entity_type, entity_id, include_undone, limit)
            .await
    }

    // -----------------------------------------------------------------------
    // Compaction
    // -----------------------------------------------------------------------

    /// Fold the owner's active records older than the compaction age into
    /// daily summaries.
    ///
    /// Each stack is applied as its own unit of work; a failing stack is
    /// logged, counted, and skipped.
    pub async fn compact_old_actions(&self, user_id: DbId) -> Result<CompactionReport, CoreError> {
        let cutoff = self.clock.now() - self.config.compaction_age;
        let stacks = self.store.list_stale_stacks(user_id, cutoff).await?;

        let mut report = CompactionReport {
            stacks: stacks.len(),
            ..Default::default()
        };

        for key in &stacks {
            let stale = self.store.list_stale_active(key, cutoff).await?;
            let plan = plan_stack(key, &stale);
            if plan.is_empty() {
                continue;
            }
            match self.store.apply_compaction(&plan).await {
                Ok(()) => {
                    report.merged_days += plan.merged.len();
                    report.merged_records += plan.delete_ids.len();
                    report.flagged_records += plan.flag_ids.len();
                }
                Err(e) => {
                    report.failed_stacks += 1;
                    tracing::warn!(
                        user_id,
                        entity_type = key.entity_type.as_str(),
                        entity_id = key.entity_id,
                        error = %e,
                        "Compaction failed for stack, skipping"
                    );
                }
            }
        }

        if report.stacks > 0 {
            tracing::info!(
                user_id,
                stacks = report.stacks,
                merged_days = report.merged_days,
                merged_records = report.merged_records,
                flagged_records = report.flagged_records,
                failed_stacks = report.failed_stacks,
                "Action log compacted"
            );
        }
        Ok(report)
    }

    /// Owners that currently have records due for compaction.
    pub async fn owners_due_for_compaction(&self) -> Result<Vec<DbId>, CoreError> {
        let cutoff = self.clock.now() - self.config.compaction_age;
        self.store.list_owners_with_stale(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::{FieldChange, FieldValue};
    use crate::clock::ManualClock;
    use crate::memory::MemoryActionLogStore;
    use chrono::{TimeZone, Utc};

    const USER: DbId = 1;
    const ITEM: &str = "TodoItem";

    fn setup(max: i64) -> (ActionLogService, Arc<MemoryActionLogStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryActionLogStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
        ));
        let config = ActionLogConfig {
            max_undoable_actions: max,
            compaction_age: chrono::Duration::days(7),
        };
        let service = ActionLogService::new(store.clone(), config).with_clock(clock.clone());
        (service, store, clock)
    }

    fn caption_change(old: &str, new: &str) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.insert("Caption", FieldChange::new(old, new));
        changes
    }

    async fn record_caption(
        service: &ActionLogService,
        clock: &ManualClock,
        entity_id: DbId,
        old: &str,
        new: &str,
    ) -> ActionLog {
        clock.advance(chrono::Duration::seconds(1));
        service
            .record(USER, ITEM, entity_id, ActionType::Update, caption_change(old, new), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn record_generates_description_when_missing() {
        let (service, _, clock) = setup(100);
        let action = record_caption(&service, &clock, 1, "A", "B").await;
        assert_eq!(action.description.as_deref(), Some("Changed caption"));
        assert!(action.is_active());
    }

    #[tokio::test]
    async fn undo_pops_most_recent_and_redo_restores_it() {
        let (service, _, clock) = setup(100);
        let first = record_caption(&service, &clock, 1, "A", "B").await;
        let second = record_caption(&service, &clock, 1, "B", "C").await;

        let undone = service.undo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(undone.id, second.id);
        assert!(undone.undone_at.is_some());
        assert!(service.can_redo(USER, ITEM, 1).await.unwrap());

        let redone = service.redo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(redone.id, second.id);
        assert_eq!(redone.occurred_at, second.occurred_at);
        assert_eq!(redone.undone_at, undone.undone_at);
        assert!(!service.can_redo(USER, ITEM, 1).await.unwrap());

        // Ordering by occurred_at is preserved: the redone record is the head again.
        let undone = service.undo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(undone.id, second.id);
        let undone = service.undo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(undone.id, first.id);
        assert!(service.undo(USER, ITEM, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn redo_head_is_the_earliest_undone() {
        let (service, _, clock) = setup(100);
        let first = record_caption(&service, &clock, 1, "A", "B").await;
        let second = record_caption(&service, &clock, 1, "B", "C").await;

        clock.advance(chrono::Duration::seconds(1));
        service.undo(USER, ITEM, 1).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));
        service.undo(USER, ITEM, 1).await.unwrap();

        let redone = service.redo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(redone.id, second.id);
        let redone = service.redo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(redone.id, first.id);
    }

    #[tokio::test]
    async fn nothing_to_undo_or_redo_is_not_an_error() {
        let (service, _, _) = setup(100);
        assert!(service.undo(USER, ITEM, 42).await.unwrap().is_none());
        assert!(service.redo(USER, ITEM, 42).await.unwrap().is_none());
        assert!(!service.can_undo(USER, ITEM, 42).await.unwrap());
        assert!(!service.can_redo(USER, ITEM, 42).await.unwrap());
    }

    #[tokio::test]
    async fn new_record_invalidates_redo_stack() {
        let (service, store, clock) = setup(100);
        record_caption(&service, &clock, 1, "A", "B").await;
        let second = record_caption(&service, &clock, 1, "B", "C").await;
        service.undo(USER, ITEM, 1).await.unwrap();

        let third = record_caption(&service, &clock, 1, "B", "D").await;

        assert!(!service.can_redo(USER, ITEM, 1).await.unwrap());
        assert!(store.get(second.id).await.is_none(), "undone record is deleted");
        let state = service.undo_redo_state(USER, ITEM, 1).await.unwrap();
        assert_eq!(state.redo_count, 0);
        assert_eq!(state.undo_count, 2);
        let head = service.undo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(head.id, third.id);
    }

    #[tokio::test]
    async fn stacks_are_independent() {
        let (service, _, clock) = setup(100);
        record_caption(&service, &clock, 1, "A", "B").await;
        record_caption(&service, &clock, 2, "X", "Y").await;
        service.undo(USER, ITEM, 1).await.unwrap();

        // Recording on entity 2 leaves entity 1's redo side alone.
        record_caption(&service, &clock, 2, "Y", "Z").await;
        assert!(service.can_redo(USER, ITEM, 1).await.unwrap());

        // Another owner has an empty stack for the same entity.
        assert!(!service.can_undo(USER + 1, ITEM, 2).await.unwrap());
    }

    #[tokio::test]
    async fn ceiling_compacts_oldest_records() {
        let (service, store, clock) = setup(5);
        let mut ids = Vec::new();
        for i in 0..8 {
            let action = record_caption(&service, &clock, 1, &i.to_string(), "x").await;
            ids.push(action.id);
        }

        let state = service.undo_redo_state(USER, ITEM, 1).await.unwrap();
        assert_eq!(state.undo_count, 5);

        for (n, id) in ids.iter().enumerate() {
            let record = store.get(*id).await.unwrap();
            assert_eq!(record.is_compacted, n < 3, "record {n} compaction flag");
        }
    }

    #[tokio::test]
    async fn state_reports_heads_and_counts() {
        let (service, _, clock) = setup(100);
        clock.advance(chrono::Duration::seconds(1));
        service
            .record(
                USER,
                ITEM,
                1,
                ActionType::Update,
                caption_change("A", "B"),
                Some("Renamed".into()),
            )
            .await
            .unwrap();
        record_caption(&service, &clock, 1, "B", "C").await;
        service.undo(USER, ITEM, 1).await.unwrap();

        let state = service.undo_redo_state(USER, ITEM, 1).await.unwrap();
        assert!(state.can_undo);
        assert!(state.can_redo);
        assert_eq!(state.undo_description.as_deref(), Some("Renamed"));
        assert_eq!(state.redo_description.as_deref(), Some("Changed caption"));
        assert_eq!(state.undo_count, 1);
        assert_eq!(state.redo_count, 1);
    }

    #[tokio::test]
    async fn record_create_and_delete_carry_snapshots() {
        let (service, _, _) = setup(100);
        let entity = serde_json::json!({ "id": 3, "caption": "Buy milk" });

        let created = service
            .record_create(USER, ITEM, 3, &entity, None)
            .await
            .unwrap();
        assert_eq!(created.action_type, ActionType::Create);
        assert_eq!(created.description.as_deref(), Some("Created todoitem"));
        let snapshot: serde_json::Value = created.changes.new_snapshot().unwrap();
        assert_eq!(snapshot, entity);

        let deleted = service
            .record_delete(USER, ITEM, 3, &entity, None)
            .await
            .unwrap();
        assert_eq!(deleted.description.as_deref(), Some("Deleted todoitem"));
        let snapshot: serde_json::Value = deleted.changes.old_snapshot().unwrap();
        assert_eq!(snapshot, entity);
    }

    #[tokio::test]
    async fn history_spans_owners_and_can_hide_undone() {
        let (service, _, clock) = setup(100);
        record_caption(&service, &clock, 1, "A", "B").await;
        clock.advance(chrono::Duration::seconds(1));
        service
            .record(USER + 1, ITEM, 1, ActionType::Update, caption_change("B", "C"), None)
            .await
            .unwrap();
        service.undo(USER + 1, ITEM, 1).await.unwrap();

        let all = service.history(ITEM, 1, true, 100).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, USER + 1, "newest first");

        let active = service.history(ITEM, 1, false, 100).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, USER);

        let limited = service.history(ITEM, 1, true, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn clear_redo_stack_removes_undone_records() {
        let (service, _, clock) = setup(100);
        record_caption(&service, &clock, 1, "A", "B").await;
        service.undo(USER, ITEM, 1).await.unwrap();

        assert_eq!(service.clear_redo_stack(USER, ITEM, 1).await.unwrap(), 1);
        assert!(!service.can_redo(USER, ITEM, 1).await.unwrap());
    }

    #[tokio::test]
    async fn discarded_record_leaves_previous_head() {
        let (service, store, clock) = setup(100);
        let first = record_caption(&service, &clock, 1, "A", "B").await;
        let second = record_caption(&service, &clock, 1, "B", "C").await;

        service.discard(&second).await.unwrap();
        // Discarding twice is harmless.
        service.discard(&second).await.unwrap();

        assert_eq!(store.len().await, 1);
        let head = service.undo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(head.id, first.id);
    }

    #[tokio::test]
    async fn staged_record_keeps_redo_until_committed() {
        let (service, _, clock) = setup(100);
        let entity = serde_json::json!({ "id": 1, "caption": "B" });
        record_caption(&service, &clock, 1, "A", "B").await;
        record_caption(&service, &clock, 1, "B", "C").await;
        service.undo(USER, ITEM, 1).await.unwrap();

        let staged = service.stage_delete(USER, ITEM, 1, &entity).await.unwrap();
        assert_eq!(staged.description.as_deref(), Some("Deleted todoitem"));
        assert!(service.can_redo(USER, ITEM, 1).await.unwrap());

        service.commit_staged(&staged).await.unwrap();
        let state = service.undo_redo_state(USER, ITEM, 1).await.unwrap();
        assert_eq!((state.undo_count, state.redo_count), (2, 0));
        assert_eq!(state.undo_description.as_deref(), Some("Deleted todoitem"));
    }

    #[tokio::test]
    async fn reverted_flips_restore_stack_positions() {
        let (service, _, clock) = setup(100);
        let first = record_caption(&service, &clock, 1, "A", "B").await;
        let second = record_caption(&service, &clock, 1, "B", "C").await;

        let undone = service.undo(USER, ITEM, 1).await.unwrap().unwrap();
        service.revert_undo(&undone).await.unwrap();
        let state = service.undo_redo_state(USER, ITEM, 1).await.unwrap();
        assert_eq!((state.undo_count, state.redo_count), (2, 0));

        clock.advance(chrono::Duration::seconds(1));
        service.undo(USER, ITEM, 1).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));
        service.undo(USER, ITEM, 1).await.unwrap();

        let redone = service.redo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(redone.id, second.id);
        service.revert_redo(&redone).await.unwrap();

        // The same record is still the redo head.
        let redone = service.redo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(redone.id, second.id);
        let redone = service.redo(USER, ITEM, 1).await.unwrap().unwrap();
        assert_eq!(redone.id, first.id);
    }

    #[tokio::test]
    async fn compaction_merges_stale_days_and_flags_lone_records() {
        let (service, store, clock) = setup(100);
        // Three edits on Jan 5 touching {Caption, Content, Caption}.
        let mut content = ChangeSet::new();
        content.insert("Content", FieldChange::old_only("first content"));
        let a = record_caption(&service, &clock, 1, "A", "B").await;
        clock.advance(chrono::Duration::minutes(5));
        let b = service
            .record(USER, ITEM, 1, ActionType::Update, content, None)
            .await
            .unwrap();
        let c = record_caption(&service, &clock, 1, "B", "C").await;
        // One edit on Jan 6.
        clock.set(Utc.with_ymd_and_hms(2026, 1, 6, 10, 0, 0).unwrap());
        let lone = record_caption(&service, &clock, 1, "C", "D").await;
        // A fresh edit that is not stale yet.
        clock.set(Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap());
        let fresh = record_caption(&service, &clock, 1, "D", "E").await;

        assert_eq!(service.owners_due_for_compaction().await.unwrap(), vec![USER]);
        let report = service.compact_old_actions(USER).await.unwrap();

        assert_eq!(report.stacks, 1);
        assert_eq!(report.merged_days, 1);
        assert_eq!(report.merged_records, 3);
        assert_eq!(report.flagged_records, 1);
        assert_eq!(report.failed_stacks, 0);

        for id in [a.id, b.id, c.id] {
            assert!(store.get(id).await.is_none(), "merged originals are removed");
        }
        assert!(store.get(lone.id).await.unwrap().is_compacted);
        assert!(store.get(fresh.id).await.unwrap().is_active());

        let history = service.history(ITEM, 1, true, 100).await.unwrap();
        let merged = history
            .iter()
            .find(|r| r.description.as_deref() == Some("Changes on Jan 05, 2026 (3 edits)"))
            .unwrap();
        assert!(merged.is_compacted);
        assert_eq!(merged.changes.len(), 2);
        assert_eq!(merged.changes.get("Caption").unwrap().old, FieldValue::from("A"));
        assert_eq!(
            merged.changes.get("Content").unwrap().old,
            FieldValue::from("first content")
        );

        // Only the fresh record is still undoable.
        let state = service.undo_redo_state(USER, ITEM, 1).await.unwrap();
        assert_eq!(state.undo_count, 1);

        // Running again finds nothing new.
        let again = service.compact_old_actions(USER).await.unwrap();
        assert_eq!(again, CompactionReport::default());
        assert!(service.owners_due_for_compaction().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_stack_does_not_block_the_others() {
        let (service, store, clock) = setup(100);
        let a1 = record_caption(&service, &clock, 1, "A", "B").await;
        let b1 = record_caption(&service, &clock, 2, "X", "Y").await;
        let b2 = record_caption(&service, &clock, 2, "Y", "Z").await;
        store.fail_compaction_for(1).await;

        clock.advance(chrono::Duration::days(10));
        let report = service.compact_old_actions(USER).await.unwrap();

        assert_eq!(report.stacks, 2);
        assert_eq!(report.failed_stacks, 1);
        assert_eq!(report.merged_days, 1);
        assert!(store.get(a1.id).await.unwrap().is_active(), "failed stack untouched");
        assert!(store.get(b1.id).await.is_none());
        assert!(store.get(b2.id).await.is_none());
    }

    #[tokio::test]
    async fn compaction_ignores_undone_records() {
        let (service, store, clock) = setup(100);
        let kept = record_caption(&service, &clock, 1, "A", "B").await;
        let undone = record_caption(&service, &clock, 1, "B", "C").await;
        service.undo(USER, ITEM, 1).await.unwrap();

        clock.advance(chrono::Duration::days(30));
        service.compact_old_actions(USER).await.unwrap();

        assert!(store.get(kept.id).await.unwrap().is_compacted);
        let undone = store.get(undone.id).await.unwrap();
        assert!(!undone.is_compacted);
        assert!(undone.is_redoable());
    }
}
