//! Journaled entity mutations.
//!
//! [`MutationService`] ties an entity's persistence ([`EntityStore`]) to the
//! action log: every create, update and delete is recorded, and undo/redo
//! replays the recorded values onto the live entity. It is generic over the
//! entity type; each domain model plugs in by implementing
//! [`JournaledEntity`].

mod service;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::action_log::ActionLog;
use crate::change_detector::Tracked;
use crate::error::CoreError;
use crate::types::DbId;

pub use service::MutationService;

/// A domain entity whose mutations are journaled.
pub trait JournaledEntity:
    Tracked + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Discriminator stored in `action_logs.entity_type`.
    const ENTITY_TYPE: &'static str;

    fn id(&self) -> DbId;

    fn set_id(&mut self, id: DbId);

    /// The user the entity belongs to, if it is owned at all.
    fn owner_id(&self) -> Option<DbId>;

    /// Reject deletion of protected entities. Runs before anything is
    /// written.
    fn check_delete(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Entities with an integer active/completed status (0 = active).
pub trait HasStatus: JournaledEntity {
    fn status(&self) -> i32;

    fn set_status(&mut self, status: i32);
}

/// Persistence for one entity type.
#[async_trait]
pub trait EntityStore<E: JournaledEntity>: Send + Sync {
    async fn find(&self, id: DbId) -> Result<Option<E>, CoreError>;

    /// Insert a new entity and return it with its assigned id.
    async fn insert(&self, entity: &E) -> Result<E, CoreError>;

    /// Persist the mutable fields of an existing entity.
    async fn update(&self, entity: &E) -> Result<E, CoreError>;

    /// Re-insert a previously deleted entity under its original id.
    async fn restore(&self, entity: &E) -> Result<E, CoreError>;

    /// Returns `false` if the entity did not exist.
    async fn remove(&self, id: DbId) -> Result<bool, CoreError>;
}

/// Result of an undo or redo request.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome<E> {
    /// The record was replayed. `entity` is the live entity afterwards,
    /// `None` when the replay removed it.
    Applied { action: ActionLog, entity: Option<E> },
    NothingToUndo,
    NothingToRedo,
}

impl<E> ReplayOutcome<E> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn map<T>(self, f: impl FnOnce(E) -> T) -> ReplayOutcome<T> {
        match self {
            Self::Applied { action, entity } => ReplayOutcome::Applied {
                action,
                entity: entity.map(f),
            },
            Self::NothingToUndo => ReplayOutcome::NothingToUndo,
            Self::NothingToRedo => ReplayOutcome::NothingToRedo,
        }
    }
}

/// Type-erased undo/redo for one entity type, so callers can dispatch on
/// the stored `entity_type` string.
#[async_trait]
pub trait EntityJournal: Send + Sync {
    fn entity_type(&self) -> &'static str;

    async fn undo(
        &self,
        user_id: DbId,
        entity_id: DbId,
    ) -> Result<ReplayOutcome<serde_json::Value>, CoreError>;

    async fn redo(
        &self,
        user_id: DbId,
        entity_id: DbId,
    ) -> Result<ReplayOutcome<serde_json::Value>, CoreError>;
}

#[async_trait]
impl<E: JournaledEntity> EntityJournal for MutationService<E> {
    fn entity_type(&self) -> &'static str {
        E::ENTITY_TYPE
    }

    async fn undo(
        &self,
        user_id: DbId,
        entity_id: DbId,
    ) -> Result<ReplayOutcome<serde_json::Value>, CoreError> {
        let outcome = MutationService::undo(self, user_id, entity_id).await?;
        Ok(outcome.map(|e| serde_json::to_value(e).unwrap_or_default()))
    }

    async fn redo(
        &self,
        user_id: DbId,
        entity_id: DbId,
    ) -> Result<ReplayOutcome<serde_json::Value>, CoreError> {
        let outcome = MutationService::redo(self, user_id, entity_id).await?;
        Ok(outcome.map(|e| serde_json::to_value(e).unwrap_or_default()))
    }
}
