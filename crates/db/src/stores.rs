//! Postgres implementations of the core store traits.

use std::marker::PhantomData;

use async_trait::async_trait;
use doit_core::action_log::{
    ActionLog, ActionLogStore, ChangeSet, CompactionPlan, NewActionLog, StackKey,
};
use doit_core::error::CoreError;
use doit_core::mutation::{EntityStore, JournaledEntity};
use doit_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::error::to_core_error;
use crate::models::action_log::ActionLogRow;
use crate::repositories::{ActionLogRepo, EntityRepo};

fn decode_all(rows: Vec<ActionLogRow>) -> Result<Vec<ActionLog>, CoreError> {
    rows.into_iter().map(ActionLogRow::into_action_log).collect()
}

fn decode_opt(row: Option<ActionLogRow>) -> Result<Option<ActionLog>, CoreError> {
    row.map(ActionLogRow::into_action_log).transpose()
}

fn missing_action(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "ActionLog",
        id,
    }
}

fn stale_plan() -> CoreError {
    CoreError::Conflict("Stack changed while compaction was planned".into())
}

// ---------------------------------------------------------------------------
// Action log
// ---------------------------------------------------------------------------

/// [`ActionLogStore`] over the `action_logs` table.
#[derive(Clone)]
pub struct PgActionLogStore {
    pool: PgPool,
}

impl PgActionLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionLogStore for PgActionLogStore {
    async fn append(&self, entry: NewActionLog) -> Result<ActionLog, CoreError> {
        ActionLogRepo::insert(&self.pool, &entry)
            .await
            .map_err(to_core_error)?
            .into_action_log()
    }

    async fn find_active_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError> {
        decode_opt(
            ActionLogRepo::find_active_head(&self.pool, key)
                .await
                .map_err(to_core_error)?,
        )
    }

    async fn find_redo_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError> {
        decode_opt(
            ActionLogRepo::find_redo_head(&self.pool, key)
                .await
                .map_err(to_core_error)?,
        )
    }

    async fn pop_active_head(
        &self,
        key: &StackKey,
        undone_at: Timestamp,
    ) -> Result<Option<ActionLog>, CoreError> {
        decode_opt(
            ActionLogRepo::pop_active_head(&self.pool, key, undone_at)
                .await
                .map_err(to_core_error)?,
        )
    }

    async fn pop_redo_head(&self, key: &StackKey) -> Result<Option<ActionLog>, CoreError> {
        decode_opt(
            ActionLogRepo::pop_redo_head(&self.pool, key)
                .await
                .map_err(to_core_error)?,
        )
    }

    async fn set_undone_at(
        &self,
        id: DbId,
        undone_at: Option<Timestamp>,
    ) -> Result<(), CoreError> {
        let found = ActionLogRepo::set_undone_at(&self.pool, id, undone_at)
            .await
            .map_err(to_core_error)?;
        if found {
            Ok(())
        } else {
            Err(missing_action(id))
        }
    }

    async fn count_active(&self, key: &StackKey) -> Result<i64, CoreError> {
        ActionLogRepo::count_active(&self.pool, key)
            .await
            .map_err(to_core_error)
    }

    async fn count_redo(&self, key: &StackKey) -> Result<i64, CoreError> {
        ActionLogRepo::count_redo(&self.pool, key)
            .await
            .map_err(to_core_error)
    }

    async fn update_changes(&self, id: DbId, changes: &ChangeSet) -> Result<(), CoreError> {
        let found = ActionLogRepo::update_changes(&self.pool, id, &changes.to_json())
            .await
            .map_err(to_core_error)?;
        if found {
            Ok(())
        } else {
            Err(missing_action(id))
        }
    }

    async fn list_history(
        &self,
        entity_type: &str,
        entity_id: DbId,
        include_undone: bool,
        limit: i64,
    ) -> Result<Vec<ActionLog>, CoreError> {
        decode_all(
            ActionLogRepo::list_history(&self.pool, entity_type, entity_id, include_undone, limit)
                .await
                .map_err(to_core_error)?,
        )
    }

    async fn discard(&self, id: DbId) -> Result<bool, CoreError> {
        ActionLogRepo::delete(&self.pool, id)
            .await
            .map_err(to_core_error)
    }

    async fn delete_redo(&self, key: &StackKey) -> Result<u64, CoreError> {
        ActionLogRepo::delete_redo(&self.pool, key)
            .await
            .map_err(to_core_error)
    }

    async fn compact_oldest_active(&self, key: &StackKey, count: i64) -> Result<u64, CoreError> {
        ActionLogRepo::compact_oldest_active(&self.pool, key, count)
            .await
            .map_err(to_core_error)
    }

    async fn list_stale_stacks(
        &self,
        user_id: DbId,
        cutoff: Timestamp,
    ) -> Result<Vec<StackKey>, CoreError> {
        let pairs = ActionLogRepo::list_stale_stacks(&self.pool, user_id, cutoff)
            .await
            .map_err(to_core_error)?;
        Ok(pairs
            .into_iter()
            .map(|(entity_type, entity_id)| StackKey::new(user_id, entity_type, entity_id))
            .collect())
    }

    async fn list_stale_active(
        &self,
        key: &StackKey,
        cutoff: Timestamp,
    ) -> Result<Vec<ActionLog>, CoreError> {
        decode_all(
            ActionLogRepo::list_stale_active(&self.pool, key, cutoff)
                .await
                .map_err(to_core_error)?,
        )
    }

    async fn list_owners_with_stale(&self, cutoff: Timestamp) -> Result<Vec<DbId>, CoreError> {
        ActionLogRepo::list_owners_with_stale(&self.pool, cutoff)
            .await
            .map_err(to_core_error)
    }

    async fn apply_compaction(&self, plan: &CompactionPlan) -> Result<(), CoreError> {
        let applied = ActionLogRepo::apply_compaction(&self.pool, plan)
            .await
            .map_err(to_core_error)?;
        if applied {
            Ok(())
        } else {
            Err(stale_plan())
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// [`EntityStore`] over one entity table, via its [`EntityRepo`].
pub struct PgEntityStore<R> {
    pool: PgPool,
    _repo: PhantomData<fn() -> R>,
}

impl<R> PgEntityStore<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _repo: PhantomData,
        }
    }
}

impl<R> Clone for PgEntityStore<R> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[async_trait]
impl<R: EntityRepo> EntityStore<R::Entity> for PgEntityStore<R> {
    async fn find(&self, id: DbId) -> Result<Option<R::Entity>, CoreError> {
        R::find_by_id(&self.pool, id).await.map_err(to_core_error)
    }

    async fn insert(&self, entity: &R::Entity) -> Result<R::Entity, CoreError> {
        R::create(&self.pool, entity).await.map_err(to_core_error)
    }

    async fn update(&self, entity: &R::Entity) -> Result<R::Entity, CoreError> {
        R::update(&self.pool, entity).await.map_err(|e| match e {
            sqlx::Error::RowNotFound => CoreError::NotFound {
                entity: <R::Entity as JournaledEntity>::ENTITY_TYPE,
                id: entity.id(),
            },
            other => to_core_error(other),
        })
    }

    async fn restore(&self, entity: &R::Entity) -> Result<R::Entity, CoreError> {
        R::restore(&self.pool, entity).await.map_err(to_core_error)
    }

    async fn remove(&self, id: DbId) -> Result<bool, CoreError> {
        R::delete(&self.pool, id).await.map_err(to_core_error)
    }
}
