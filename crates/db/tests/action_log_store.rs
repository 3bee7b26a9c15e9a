//! Integration tests for the Postgres action log store.
//!
//! Drives [`ActionLogService`] over [`PgActionLogStore`] so the stack
//! predicates, head ordering, and compaction transaction run against real SQL.

#![cfg(feature = "db-tests")]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use assert_matches::assert_matches;
use doit_core::action_log::compaction::plan_stack;
use doit_core::action_log::{
    ActionLogConfig, ActionLogService, ActionLogStore, ActionType, ChangeSet, FieldChange,
    StackKey,
};
use doit_core::clock::ManualClock;
use doit_core::error::CoreError;
use doit_db::stores::PgActionLogStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn service(pool: PgPool, max: i64) -> (ActionLogService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    ));
    let config = ActionLogConfig {
        max_undoable_actions: max,
        compaction_age: Duration::days(7),
    };
    let svc = ActionLogService::new(Arc::new(PgActionLogStore::new(pool)), config)
        .with_clock(clock.clone());
    (svc, clock)
}

fn caption(old: &str, new: &str) -> ChangeSet {
    let mut changes = ChangeSet::new();
    changes.insert("Caption", FieldChange::new(old, new));
    changes
}

async fn edit(svc: &ActionLogService, clock: &ManualClock, entity_id: i64, old: &str, new: &str) {
    svc.record(1, "TodoItem", entity_id, ActionType::Update, caption(old, new), None)
        .await
        .unwrap();
    clock.advance(Duration::minutes(1));
}

// ---------------------------------------------------------------------------
// Undo / redo
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn undo_pops_most_recent_and_redo_restores_it(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;
    edit(&svc, &clock, 7, "B", "C").await;

    let undone = svc.undo(1, "TodoItem", 7).await.unwrap().unwrap();
    assert_eq!(undone.changes, caption("B", "C"));
    assert!(undone.undone_at.is_some());

    let redone = svc.redo(1, "TodoItem", 7).await.unwrap().unwrap();
    assert_eq!(redone.id, undone.id);
    assert_eq!(redone.undone_at, undone.undone_at);

    let state = svc.undo_redo_state(1, "TodoItem", 7).await.unwrap();
    assert_eq!(state.undo_count, 2);
    assert_eq!(state.redo_count, 0);
    assert_eq!(state.undo_description.as_deref(), Some("Changed caption"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn redo_head_is_earliest_undone(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;
    edit(&svc, &clock, 7, "B", "C").await;

    let first = svc.undo(1, "TodoItem", 7).await.unwrap().unwrap();
    clock.advance(Duration::seconds(5));
    svc.undo(1, "TodoItem", 7).await.unwrap().unwrap();

    let head = svc.redo(1, "TodoItem", 7).await.unwrap().unwrap();
    assert_eq!(head.id, first.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn redo_order_follows_undo_order_within_same_instant(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;
    edit(&svc, &clock, 7, "B", "C").await;

    // Both undos share one `undone_at`.
    let first = svc.undo(1, "TodoItem", 7).await.unwrap().unwrap();
    let second = svc.undo(1, "TodoItem", 7).await.unwrap().unwrap();
    assert_eq!(first.undone_at, second.undone_at);

    assert_eq!(svc.redo(1, "TodoItem", 7).await.unwrap().unwrap().id, first.id);
    assert_eq!(svc.redo(1, "TodoItem", 7).await.unwrap().unwrap().id, second.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn new_record_clears_redo_stack(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;
    svc.undo(1, "TodoItem", 7).await.unwrap();
    assert!(svc.can_redo(1, "TodoItem", 7).await.unwrap());

    edit(&svc, &clock, 7, "A", "Z").await;

    assert!(!svc.can_redo(1, "TodoItem", 7).await.unwrap());
    assert!(svc.redo(1, "TodoItem", 7).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stacks_are_isolated_by_owner_and_entity(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;

    assert!(svc.undo(2, "TodoItem", 7).await.unwrap().is_none());
    assert!(svc.undo(1, "TodoItem", 8).await.unwrap().is_none());
    assert!(svc.undo(1, "Note", 7).await.unwrap().is_none());
    assert!(svc.undo(1, "TodoItem", 7).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reverted_undo_restores_active_head(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;

    let undone = svc.undo(1, "TodoItem", 7).await.unwrap().unwrap();
    svc.revert_undo(&undone).await.unwrap();

    assert!(svc.can_undo(1, "TodoItem", 7).await.unwrap());
    assert!(!svc.can_redo(1, "TodoItem", 7).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn saved_changes_replace_payload(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;

    let undone = svc.undo(1, "TodoItem", 7).await.unwrap().unwrap();
    svc.save_changes(undone.id, &caption("A", "B2")).await.unwrap();

    let redone = svc.redo(1, "TodoItem", 7).await.unwrap().unwrap();
    assert_eq!(redone.changes, caption("A", "B2"));
}

// ---------------------------------------------------------------------------
// Ceiling and compaction
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn ceiling_compacts_oldest_active(pool: PgPool) {
    let (svc, clock) = service(pool, 3);
    for i in 0..5 {
        edit(&svc, &clock, 7, &i.to_string(), &(i + 1).to_string()).await;
    }

    let state = svc.undo_redo_state(1, "TodoItem", 7).await.unwrap();
    assert_eq!(state.undo_count, 3);

    let history = svc.history("TodoItem", 7, true, 100).await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history.iter().filter(|a| a.is_compacted).count(), 2);
    // Newest first.
    assert_eq!(history[0].changes, caption("4", "5"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn compaction_merges_stale_days(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;
    edit(&svc, &clock, 7, "B", "C").await;
    edit(&svc, &clock, 8, "X", "Y").await;

    clock.advance(Duration::days(8));
    assert_eq!(svc.owners_due_for_compaction().await.unwrap(), vec![1]);

    let report = svc.compact_old_actions(1).await.unwrap();
    assert_eq!(report.stacks, 2);
    assert_eq!(report.merged_days, 1);
    assert_eq!(report.merged_records, 2);
    assert_eq!(report.flagged_records, 1);
    assert_eq!(report.failed_stacks, 0);

    let history = svc.history("TodoItem", 7, true, 100).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_compacted);
    assert_eq!(
        history[0].changes.get("Caption"),
        Some(&FieldChange::old_only("A"))
    );

    assert!(!svc.can_undo(1, "TodoItem", 7).await.unwrap());
    assert!(svc.owners_due_for_compaction().await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn compaction_plan_rejected_when_record_undone_meanwhile(pool: PgPool) {
    let (svc, clock) = service(pool.clone(), 100);
    edit(&svc, &clock, 7, "A", "B").await;
    edit(&svc, &clock, 7, "B", "C").await;
    clock.advance(Duration::days(8));

    let store = PgActionLogStore::new(pool);
    let key = StackKey::new(1, "TodoItem", 7);
    let stale = store.list_stale_active(&key, svc.now() - Duration::days(7)).await.unwrap();
    let plan = plan_stack(&key, &stale);
    assert_eq!(plan.delete_ids.len(), 2);

    let undone = svc.undo(1, "TodoItem", 7).await.unwrap().unwrap();

    assert_matches!(store.apply_compaction(&plan).await, Err(CoreError::Conflict(_)));

    let history = svc.history("TodoItem", 7, true, 100).await.unwrap();
    assert_eq!(history.len(), 2, "rolled back, nothing merged");
    assert!(history.iter().all(|a| !a.is_compacted));
    let state = svc.undo_redo_state(1, "TodoItem", 7).await.unwrap();
    assert_eq!((state.undo_count, state.redo_count), (1, 1));
    assert_eq!(svc.redo(1, "TodoItem", 7).await.unwrap().unwrap().id, undone.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn history_can_hide_undone(pool: PgPool) {
    let (svc, clock) = service(pool, 100);
    edit(&svc, &clock, 7, "A", "B").await;
    edit(&svc, &clock, 7, "B", "C").await;
    svc.undo(1, "TodoItem", 7).await.unwrap();

    assert_eq!(svc.history("TodoItem", 7, true, 100).await.unwrap().len(), 2);
    assert_eq!(svc.history("TodoItem", 7, false, 100).await.unwrap().len(), 1);
    assert_eq!(svc.history("TodoItem", 7, true, 1).await.unwrap().len(), 1);
}
