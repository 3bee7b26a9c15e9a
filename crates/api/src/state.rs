use std::collections::HashMap;
use std::sync::Arc;

use doit_core::action_log::ActionLogService;
use doit_core::error::CoreError;
use doit_core::mutation::{EntityJournal, MutationService};
use doit_db::models::dependency::Dependency;
use doit_db::models::note::Note;
use doit_db::models::person::Person;
use doit_db::models::tag::Tag;
use doit_db::models::todo_item::TodoItem;
use doit_db::repositories::{DependencyRepo, NoteRepo, PersonRepo, TagRepo, TodoItemRepo};
use doit_db::stores::{PgActionLogStore, PgEntityStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every service holds its stores behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: doit_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub action_log: ActionLogService,
    pub todo_items: MutationService<TodoItem>,
    pub persons: MutationService<Person>,
    pub tags: MutationService<Tag>,
    pub notes: MutationService<Note>,
    pub dependencies: MutationService<Dependency>,
    /// Undo/redo dispatch keyed by the stored `entity_type`.
    journals: Arc<HashMap<&'static str, Arc<dyn EntityJournal>>>,
}

impl AppState {
    /// Wire the Postgres stores into the engine.
    pub fn new(pool: doit_db::DbPool, config: ServerConfig) -> Self {
        let action_log = ActionLogService::new(
            Arc::new(PgActionLogStore::new(pool.clone())),
            config.action_log.clone(),
        );

        let todo_items = MutationService::new(
            action_log.clone(),
            Arc::new(PgEntityStore::<TodoItemRepo>::new(pool.clone())),
        );
        let persons = MutationService::new(
            action_log.clone(),
            Arc::new(PgEntityStore::<PersonRepo>::new(pool.clone())),
        );
        let tags = MutationService::new(
            action_log.clone(),
            Arc::new(PgEntityStore::<TagRepo>::new(pool.clone())),
        );
        let notes = MutationService::new(
            action_log.clone(),
            Arc::new(PgEntityStore::<NoteRepo>::new(pool.clone())),
        );
        let dependencies = MutationService::new(
            action_log.clone(),
            Arc::new(PgEntityStore::<DependencyRepo>::new(pool.clone())),
        );

        let registry: [Arc<dyn EntityJournal>; 5] = [
            Arc::new(todo_items.clone()),
            Arc::new(persons.clone()),
            Arc::new(tags.clone()),
            Arc::new(notes.clone()),
            Arc::new(dependencies.clone()),
        ];
        let journals = registry
            .into_iter()
            .map(|journal| (journal.entity_type(), journal))
            .collect();

        Self {
            pool,
            config: Arc::new(config),
            action_log,
            todo_items,
            persons,
            tags,
            notes,
            dependencies,
            journals: Arc::new(journals),
        }
    }

    /// The journal for a stored entity type, or a validation error for an
    /// unknown one.
    pub fn journal(&self, entity_type: &str) -> Result<Arc<dyn EntityJournal>, CoreError> {
        self.journals.get(entity_type).cloned().ok_or_else(|| {
            CoreError::Validation(format!("Unknown entity type '{entity_type}'"))
        })
    }
}
