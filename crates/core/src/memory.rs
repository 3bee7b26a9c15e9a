//! In-memory store implementations.
//!
//! Used by unit tests and by anything that wants the engine without a
//! database. Each store guards its state with one async mutex, so every
//! operation is atomic.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::action_log::{
    ActionLog, ActionLogStore, ChangeSet, CompactionPlan, NewActionLog, StackKey,
};
use crate::error::CoreError;
use crate::mutation::{EntityStore, JournaledEntity};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Action log
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LogState {
    next_id: DbId,
    records: Vec<ActionLog>,
}

impl LogState {
    fn stack<'a>(&'a self, key: &'a StackKey) -> impl Iterator<Item = &'a ActionLog> + 'a {
        self.records.iter().filter(move |r| {
            r.user_id == key.user_id && r.entity_id == key.entity_id && r.entity_type == key.entity_type
        })
    }

    fn active_head_id(&self, key: &StackKey) -> Option<DbId> {
        self.stack(key)
            .filter(|r| r.is_active())
            .max_by_key(|r| (r.occurred_at, r.id))
            .map(|r| r.id)
    }

    fn redo_head_id(&self, key: &StackKey) -> Option<DbId> {
        self.stack(key)
            .filter(|r| r.is_redoable())
            .min_by_key(|r| (r.undone_at, Reverse(r.id)))
            .map(|r| r.id)
    }

    fn get_mut(&mut self, id: DbId) -> Option<&mut ActionLog> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    fn push(&mut self, entry: NewActionLog) -> ActionLog {
        self.next_id += 1;
        let record = ActionLog {
            id: self.next_id,
            user_id: entry.user_id,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            action_type: entry.action_type,
            changes: entry.changes,
            occurred_at: entry.occurred_at,
            is_compacted: entry.is_compacted,
            undone_at: None,
            description: entry.description,
        };
        self.records.push(record.clone());
        record
    }
}

/// [`ActionLogStore`] backed by a vector.
#[derive(Default)]
pub struct MemoryActionLogStore {
    state: Mutex<LogState>,
    failing_entities: Mutex<HashSet<DbId>>,
}

impl MemoryActionLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: DbId) -> Option<ActionLog> {
        self.state.lock().await.records.iter().find(|r| r.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Make [`ActionLogStore::apply_compaction`] fail for stacks of this
    /// entity id. Simulates a storage fault partway through a sweep.
    pub async fn fail_compaction_for(&self, entity_id: DbId) {
        self.failing_entities.lock().await.insert(entity_id);
    }
}

#[async_trait]
impl ActionLogStore for MemoryActionLogStore {
    async fn append(&self, entry: NewActionLog) -> Result<ActionLog, CoreError> {
        Ok(self.state.lock().await.push(entry))
    }

    async fn find_active_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError> {
        let state = self.state.lock().await;
        let id = state.active_head_id(key);
        Ok(id.and_then(|id| state.records.iter().find(|r| r.id == id).cloned()))
    }

    async fn find_redo_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError> {
        let state = self.state.lock().await;
        let id = state.redo_head_id(key);
        Ok(id.and_then(|id| state.records.iter().find(|r| r.id == id).cloned()))
    }

    async fn pop_active_head(
        &self,
        key: &StackKey,
        undone_at: Timestamp,
    ) -> Result<Option<ActionLog>, CoreError> {
        let mut state = self.state.lock().await;
        let Some(id) = state.active_head_id(key) else {
            return Ok(None);
        };
        Ok(state.get_mut(id).map(|r| {
            r.undone_at = Some(undone_at);
            r.clone()
        }))
    }

    async fn pop_redo_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError> {
        let mut state = self.state.lock().await;
        let Some(id) = state.redo_head_id(key) else {
            return Ok(None);
        };
        Ok(state.get_mut(id).map(|r| {
            let popped = r.clone();
            r.undone_at = None;
            popped
        }))
    }

    async fn set_undone_at(
        &self,
        id: DbId,
        undone_at: Option<Timestamp>,
    ) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let record = state.get_mut(id).ok_or(CoreError::NotFound {
            entity: "ActionLog",
            id,
        })?;
        record.undone_at = undone_at;
        Ok(())
    }

    async fn count_active(&self, key: &StackKey) -> Result<i64, CoreError> {
        let state = self.state.lock().await;
        Ok(state.stack(key).filter(|r| r.is_active()).count() as i64)
    }

    async fn count_redo(&self, key: &StackKey) -> Result<i64, CoreError> {
        let state = self.state.lock().await;
        Ok(state.stack(key).filter(|r| r.is_redoable()).count() as i64)
    }

    async fn update_changes(&self, id: DbId, changes: &ChangeSet) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let record = state.get_mut(id).ok_or(CoreError::NotFound {
            entity: "ActionLog",
            id,
        })?;
        record.changes = changes.clone();
        Ok(())
    }

    async fn list_history(
        &self,
        entity_type: &str,
        entity_id: DbId,
        include_undone: bool,
        limit: i64,
    ) -> Result<Vec<ActionLog>, CoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<ActionLog> = state
            .records
            .iter()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .filter(|r| include_undone || r.undone_at.is_none())
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.occurred_at, b.id).cmp(&(a.occurred_at, a.id)));
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn discard(&self, id: DbId) -> Result<bool, CoreError> {
        let mut state = self.state.lock().await;
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        Ok(state.records.len() < before)
    }

    async fn delete_redo(&self, key: &StackKey) -> Result<u64, CoreError> {
        let mut state = self.state.lock().await;
        let before = state.records.len();
        state.records.retain(|r| {
            !(r.user_id == key.user_id
                && r.entity_type == key.entity_type
                && r.entity_id == key.entity_id
                && r.undone_at.is_some())
        });
        Ok((before - state.records.len()) as u64)
    }

    async fn compact_oldest_active(&self, key: &StackKey, count: i64) -> Result<u64, CoreError> {
        let mut state = self.state.lock().await;
        let mut oldest: Vec<(Timestamp, DbId)> = state
            .stack(key)
            .filter(|r| r.is_active())
            .map(|r| (r.occurred_at, r.id))
            .collect();
        oldest.sort();
        oldest.truncate(usize::try_from(count.max(0)).unwrap_or(0));

        for (_, id) in &oldest {
            if let Some(r) = state.get_mut(*id) {
                r.is_compacted = true;
            }
        }
        Ok(oldest.len() as u64)
    }

    async fn list_stale_stacks(
        &self,
        user_id: DbId,
        cutoff: Timestamp,
    ) -> Result<Vec<StackKey>, CoreError> {
        let state = self.state.lock().await;
        let keys: BTreeSet<(String, DbId)> = state
            .records
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active() && r.occurred_at < cutoff)
            .map(|r| (r.entity_type.clone(), r.entity_id))
            .collect();
        Ok(keys
            .into_iter()
            .map(|(entity_type, entity_id)| StackKey::new(user_id, entity_type, entity_id))
            .collect())
    }

    async fn list_stale_active(
        &self,
        key: &StackKey,
        cutoff: Timestamp,
    ) -> Result<Vec<ActionLog>, CoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<ActionLog> = state
            .stack(key)
            .filter(|r| r.is_active() && r.occurred_at < cutoff)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.occurred_at, r.id));
        Ok(rows)
    }

    async fn list_owners_with_stale(&self, cutoff: Timestamp) -> Result<Vec<DbId>, CoreError> {
        let state = self.state.lock().await;
        let owners: BTreeSet<DbId> = state
            .records
            .iter()
            .filter(|r| r.is_active() && r.occurred_at < cutoff)
            .map(|r| r.user_id)
            .collect();
        Ok(owners.into_iter().collect())
    }

    async fn apply_compaction(&self, plan: &CompactionPlan) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        {
            let failing = self.failing_entities.lock().await;
            let touched = plan.delete_ids.iter().chain(&plan.flag_ids);
            let fails = touched
                .filter_map(|id| state.records.iter().find(|r| r.id == *id))
                .any(|r| failing.contains(&r.entity_id));
            if fails {
                return Err(CoreError::Storage("simulated compaction failure".into()));
            }
        }

        let still_active = plan
            .planned_ids()
            .iter()
            .all(|id| state.records.iter().any(|r| r.id == *id && r.is_active()));
        if !still_active {
            return Err(CoreError::Conflict(
                "Stack changed while compaction was planned".into(),
            ));
        }

        state.records.retain(|r| !plan.delete_ids.contains(&r.id));
        for merged in &plan.merged {
            state.push(merged.clone());
        }
        for id in &plan.flag_ids {
            if let Some(r) = state.get_mut(*id) {
                r.is_compacted = true;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

struct EntityState<E> {
    next_id: DbId,
    rows: BTreeMap<DbId, E>,
}

/// [`EntityStore`] backed by an ordered map.
pub struct MemoryEntityStore<E> {
    state: Mutex<EntityState<E>>,
}

impl<E> Default for MemoryEntityStore<E> {
    fn default() -> Self {
        Self {
            state: Mutex::new(EntityState {
                next_id: 0,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl<E: JournaledEntity> MemoryEntityStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<E> {
        self.state.lock().await.rows.values().cloned().collect()
    }
}

#[async_trait]
impl<E: JournaledEntity> EntityStore<E> for MemoryEntityStore<E> {
    async fn find(&self, id: DbId) -> Result<Option<E>, CoreError> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }

    async fn insert(&self, entity: &E) -> Result<E, CoreError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let mut row = entity.clone();
        row.set_id(state.next_id);
        state.rows.insert(row.id(), row.clone());
        Ok(row)
    }

    async fn update(&self, entity: &E) -> Result<E, CoreError> {
        let mut state = self.state.lock().await;
        let id = entity.id();
        match state.rows.get_mut(&id) {
            Some(row) => {
                *row = entity.clone();
                Ok(entity.clone())
            }
            None => Err(CoreError::NotFound {
                entity: E::ENTITY_TYPE,
                id,
            }),
        }
    }

    async fn restore(&self, entity: &E) -> Result<E, CoreError> {
        let mut state = self.state.lock().await;
        let id = entity.id();
        if state.rows.contains_key(&id) {
            return Err(CoreError::Conflict(format!(
                "{} {id} already exists",
                E::ENTITY_TYPE
            )));
        }
        state.next_id = state.next_id.max(id);
        state.rows.insert(id, entity.clone());
        Ok(entity.clone())
    }

    async fn remove(&self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.state.lock().await.rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::compaction::plan_stack;
    use crate::action_log::{ActionType, FieldChange};
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn key() -> StackKey {
        StackKey::new(1, "TodoItem", 9)
    }

    fn entry(minute: u32) -> NewActionLog {
        let mut changes = ChangeSet::new();
        changes.insert("Caption", FieldChange::old_only(format!("v{minute}")));
        NewActionLog {
            user_id: 1,
            entity_type: "TodoItem".into(),
            entity_id: 9,
            action_type: ActionType::Update,
            changes,
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 5, 9, minute, 0).unwrap(),
            is_compacted: false,
            description: None,
        }
    }

    #[tokio::test]
    async fn compaction_plan_rejected_after_concurrent_undo() {
        let store = MemoryActionLogStore::new();
        let first = store.append(entry(0)).await.unwrap();
        let second = store.append(entry(1)).await.unwrap();

        let cutoff = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let stale = store.list_stale_active(&key(), cutoff).await.unwrap();
        let plan = plan_stack(&key(), &stale);
        assert_eq!(plan.delete_ids.len(), 2);

        // The head is undone after planning but before the plan lands.
        let undone_at = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let undone = store.pop_active_head(&key(), undone_at).await.unwrap().unwrap();
        assert_eq!(undone.id, second.id);

        let result = store.apply_compaction(&plan).await;
        assert_matches!(result, Err(CoreError::Conflict(_)));

        assert_eq!(store.len().await, 2, "nothing merged");
        let second = store.get(second.id).await.unwrap();
        assert!(second.is_redoable());
        assert!(store.get(first.id).await.unwrap().is_active());
        let redo = store.find_redo_head(&key()).await.unwrap().unwrap();
        assert_eq!(redo.id, second.id);
    }

    #[tokio::test]
    async fn redo_head_breaks_undone_at_ties_by_undo_order() {
        let store = MemoryActionLogStore::new();
        let first = store.append(entry(0)).await.unwrap();
        let second = store.append(entry(1)).await.unwrap();

        let at = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        store.pop_active_head(&key(), at).await.unwrap();
        store.pop_active_head(&key(), at).await.unwrap();

        // `second` was undone first, so it is redone first.
        let head = store.pop_redo_head(&key()).await.unwrap().unwrap();
        assert_eq!(head.id, second.id);
        let head = store.pop_redo_head(&key()).await.unwrap().unwrap();
        assert_eq!(head.id, first.id);
    }
}
