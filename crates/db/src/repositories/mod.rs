//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod action_log_repo;
pub mod dependency_repo;
pub mod note_repo;
pub mod person_repo;
pub mod tag_repo;
pub mod todo_item_repo;
pub mod user_config_repo;

pub use action_log_repo::ActionLogRepo;
pub use dependency_repo::DependencyRepo;
pub use note_repo::NoteRepo;
pub use person_repo::PersonRepo;
pub use tag_repo::TagRepo;
pub use todo_item_repo::TodoItemRepo;
pub use user_config_repo::UserConfigRepo;

use async_trait::async_trait;
use doit_core::mutation::JournaledEntity;
use doit_core::types::DbId;
use sqlx::{PgConnection, PgPool};

/// The CRUD surface a journaled entity's repository exposes to the
/// mutation service.
#[async_trait]
pub trait EntityRepo: Send + Sync + 'static {
    type Entity: JournaledEntity;

    async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Self::Entity>, sqlx::Error>;

    async fn create(pool: &PgPool, entity: &Self::Entity) -> Result<Self::Entity, sqlx::Error>;

    async fn update(pool: &PgPool, entity: &Self::Entity) -> Result<Self::Entity, sqlx::Error>;

    /// Re-insert a deleted row under its original id.
    async fn restore(pool: &PgPool, entity: &Self::Entity) -> Result<Self::Entity, sqlx::Error>;

    /// Returns `true` if a row was deleted.
    async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error>;
}

/// Move a table's id sequence past its largest id, so rows re-inserted
/// with explicit ids cannot collide with later inserts.
pub(crate) async fn bump_id_sequence(
    conn: &mut PgConnection,
    table: &str,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
                       GREATEST((SELECT COALESCE(MAX(id), 0) FROM {table}), 1))"
    );
    sqlx::query(&sql).execute(conn).await?;
    Ok(())
}
