use std::sync::Arc;

use crate::action_log::describe::status_description;
use crate::action_log::{ActionLog, ActionLogService, ActionType, ChangeSet, FieldChange};
use crate::change_detector::{apply_new, apply_old, capture_new, detect_changes};
use crate::error::CoreError;
use crate::mutation::{EntityStore, HasStatus, JournaledEntity, ReplayOutcome};
use crate::types::DbId;

/// Outcome of replaying one record onto the live entity.
enum Step<E> {
    Done(Option<E>),
    /// The live entity was not in a state the record can apply to.
    Skipped,
}

/// Journaled CRUD plus undo/redo for one entity type.
pub struct MutationService<E: JournaledEntity> {
    log: ActionLogService,
    store: Arc<dyn EntityStore<E>>,
}

impl<E: JournaledEntity> Clone for MutationService<E> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<E: JournaledEntity> MutationService<E> {
    pub fn new(log: ActionLogService, store: Arc<dyn EntityStore<E>>) -> Self {
        Self { log, store }
    }

    pub fn action_log(&self) -> &ActionLogService {
        &self.log
    }

    /// Load an entity visible to `user_id`.
    pub async fn get(&self, user_id: DbId, id: DbId) -> Result<E, CoreError> {
        let not_found = CoreError::NotFound {
            entity: E::ENTITY_TYPE,
            id,
        };
        let entity = self.store.find(id).await?.ok_or(not_found)?;
        match entity.owner_id() {
            Some(owner) if owner != user_id => Err(CoreError::NotFound {
                entity: E::ENTITY_TYPE,
                id,
            }),
            _ => Ok(entity),
        }
    }

    /// Persist a new entity, then journal it with a full snapshot.
    pub async fn create(&self, user_id: DbId, entity: &E) -> Result<E, CoreError> {
        let created = self.store.insert(entity).await?;
        self.log
            .record_create(user_id, E::ENTITY_TYPE, created.id(), &created, None)
            .await?;
        Ok(created)
    }

    /// Edit an entity in place and journal the tracked fields that changed.
    ///
    /// An edit that changes no tracked field writes no action log record.
    pub async fn update<F>(&self, user_id: DbId, id: DbId, edit: F) -> Result<E, CoreError>
    where
        F: FnOnce(&mut E) + Send,
    {
        let current = self.get(user_id, id).await?;
        let mut incoming = current.clone();
        edit(&mut incoming);
        incoming.set_id(id);

        let changes = detect_changes(&current, &incoming);
        let updated = self.store.update(&incoming).await?;

        if changes.is_empty() {
            tracing::debug!(user_id, entity_type = E::ENTITY_TYPE, entity_id = id, "No tracked changes, nothing journaled");
        } else {
            self.log
                .record(user_id, E::ENTITY_TYPE, id, ActionType::Update, changes, None)
                .await?;
        }
        Ok(updated)
    }

    /// Journal a snapshot of an entity, then delete it.
    ///
    /// The redo stack is only invalidated once the row is gone. If the store
    /// refuses the delete (e.g. the row is still referenced) the staged
    /// record is discarded and the stacks are as they were.
    pub async fn delete(&self, user_id: DbId, id: DbId) -> Result<(), CoreError> {
        let current = self.get(user_id, id).await?;
        current.check_delete()?;

        let action = self
            .log
            .stage_delete(user_id, E::ENTITY_TYPE, id, &current)
            .await?;

        let removed = match self.store.remove(id).await {
            Ok(removed) => removed,
            Err(e) => {
                self.discard_quietly(&action).await;
                return Err(e);
            }
        };
        if !removed {
            self.discard_quietly(&action).await;
            return Err(CoreError::NotFound {
                entity: E::ENTITY_TYPE,
                id,
            });
        }
        self.log.commit_staged(&action).await
    }

    async fn discard_quietly(&self, action: &ActionLog) {
        if let Err(e) = self.log.discard(action).await {
            tracing::error!(action_id = action.id, error = %e, "Failed to discard record of failed delete");
        }
    }

    // -----------------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------------

    /// Undo the most recent action on an entity.
    ///
    /// If the live entity cannot take the reverse change (e.g. undoing a
    /// create whose entity is already gone), the record is put back on the
    /// active stack and `NothingToUndo` is returned.
    pub async fn undo(&self, user_id: DbId, id: DbId) -> Result<ReplayOutcome<E>, CoreError> {
        let Some(mut action) = self.log.undo(user_id, E::ENTITY_TYPE, id).await? else {
            return Ok(ReplayOutcome::NothingToUndo);
        };

        match self.reverse(&mut action).await {
            Ok(Step::Done(entity)) => Ok(ReplayOutcome::Applied { action, entity }),
            Ok(Step::Skipped) => {
                tracing::info!(
                    user_id,
                    entity_type = E::ENTITY_TYPE,
                    entity_id = id,
                    action_id = action.id,
                    "Undo not applicable to live entity, restored record"
                );
                self.log.revert_undo(&action).await?;
                Ok(ReplayOutcome::NothingToUndo)
            }
            Err(e) => {
                if let Err(revert_err) = self.log.revert_undo(&action).await {
                    tracing::error!(action_id = action.id, error = %revert_err, "Failed to restore undone record");
                }
                Err(e)
            }
        }
    }

    /// Redo the earliest undone action on an entity.
    pub async fn redo(&self, user_id: DbId, id: DbId) -> Result<ReplayOutcome<E>, CoreError> {
        let Some(mut action) = self.log.redo(user_id, E::ENTITY_TYPE, id).await? else {
            return Ok(ReplayOutcome::NothingToRedo);
        };

        match self.forward(&action).await {
            Ok(Step::Done(entity)) => {
                action.undone_at = None;
                Ok(ReplayOutcome::Applied { action, entity })
            }
            Ok(Step::Skipped) => {
                tracing::info!(
                    user_id,
                    entity_type = E::ENTITY_TYPE,
                    entity_id = id,
                    action_id = action.id,
                    "Redo not applicable to live entity, restored record"
                );
                self.log.revert_redo(&action).await?;
                Ok(ReplayOutcome::NothingToRedo)
            }
            Err(e) => {
                if let Err(revert_err) = self.log.revert_redo(&action).await {
                    tracing::error!(action_id = action.id, error = %revert_err, "Failed to restore redone record");
                }
                Err(e)
            }
        }
    }

    async fn reverse(&self, action: &mut ActionLog) -> Result<Step<E>, CoreError> {
        let id = action.entity_id;
        match action.action_type {
            ActionType::Create => {
                if self.store.remove(id).await? {
                    Ok(Step::Done(None))
                } else {
                    Ok(Step::Skipped)
                }
            }
            ActionType::Delete => {
                let Some(snapshot) = action.changes.old_snapshot::<E>() else {
                    tracing::warn!(action_id = action.id, "Delete record has no usable snapshot");
                    return Ok(Step::Skipped);
                };
                self.recreate(snapshot).await
            }
            ActionType::Update => {
                let Some(mut live) = self.store.find(id).await? else {
                    return Ok(Step::Skipped);
                };
                // Capture the current values so a later redo can re-apply them.
                capture_new(&live, &mut action.changes);
                self.log.save_changes(action.id, &action.changes).await?;

                apply_old(&mut live, &action.changes);
                let updated = self.store.update(&live).await?;
                Ok(Step::Done(Some(updated)))
            }
        }
    }

    async fn forward(&self, action: &ActionLog) -> Result<Step<E>, CoreError> {
        let id = action.entity_id;
        match action.action_type {
            ActionType::Delete => {
                if self.store.remove(id).await? {
                    Ok(Step::Done(None))
                } else {
                    Ok(Step::Skipped)
                }
            }
            ActionType::Create => {
                let Some(snapshot) = action.changes.new_snapshot::<E>() else {
                    tracing::warn!(action_id = action.id, "Create record has no usable snapshot");
                    return Ok(Step::Skipped);
                };
                self.recreate(snapshot).await
            }
            ActionType::Update => {
                let Some(mut live) = self.store.find(id).await? else {
                    return Ok(Step::Skipped);
                };
                apply_new(&mut live, &action.changes);
                let updated = self.store.update(&live).await?;
                Ok(Step::Done(Some(updated)))
            }
        }
    }

    async fn recreate(&self, snapshot: E) -> Result<Step<E>, CoreError> {
        if self.store.find(snapshot.id()).await?.is_some() {
            return Ok(Step::Skipped);
        }
        let restored = self.store.restore(&snapshot).await?;
        Ok(Step::Done(Some(restored)))
    }
}

impl<E: HasStatus> MutationService<E> {
    /// Flip between active (0) and completed (1).
    ///
    /// Journals only the previous status; the new side is captured on undo.
    pub async fn toggle_status(&self, user_id: DbId, id: DbId) -> Result<E, CoreError> {
        let mut entity = self.get(user_id, id).await?;
        let old_status = entity.status();
        let new_status = if old_status == 0 { 1 } else { 0 };
        entity.set_status(new_status);

        let updated = self.store.update(&entity).await?;

        let mut changes = ChangeSet::new();
        changes.insert("Status", FieldChange::old_only(old_status));
        self.log
            .record(
                user_id,
                E::ENTITY_TYPE,
                id,
                ActionType::Update,
                changes,
                Some(status_description(old_status, new_status)),
            )
            .await?;
        Ok(updated)
    }
}
