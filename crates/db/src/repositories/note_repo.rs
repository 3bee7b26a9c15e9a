//! Repository for the `todo_notes` table.

use async_trait::async_trait;
use doit_core::types::DbId;
use sqlx::PgPool;

use crate::models::note::Note;
use crate::repositories::{bump_id_sequence, EntityRepo};

/// Column list for `todo_notes` queries.
const COLUMNS: &str = "id, status, user_id, person_id, tag_id, content, created_at, updated_at";

/// Provides CRUD operations for notes.
pub struct NoteRepo;

impl NoteRepo {
    /// A user's notes, newest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Note>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM todo_notes WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}

#[async_trait]
impl EntityRepo for NoteRepo {
    type Entity = Note;

    async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Note>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM todo_notes WHERE id = $1");
        sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    async fn create(pool: &PgPool, note: &Note) -> Result<Note, sqlx::Error> {
        let sql = format!(
            "INSERT INTO todo_notes (status, user_id, person_id, tag_id, content) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(note.status)
            .bind(note.user_id)
            .bind(note.person_id)
            .bind(note.tag_id)
            .bind(&note.content)
            .fetch_one(pool)
            .await
    }

    async fn update(pool: &PgPool, note: &Note) -> Result<Note, sqlx::Error> {
        let sql = format!(
            "UPDATE todo_notes SET \
                status = $2, person_id = $3, tag_id = $4, content = $5, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(note.id)
            .bind(note.status)
            .bind(note.person_id)
            .bind(note.tag_id)
            .bind(&note.content)
            .fetch_one(pool)
            .await
    }

    async fn restore(pool: &PgPool, note: &Note) -> Result<Note, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO todo_notes (id, status, user_id, person_id, tag_id, content, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let restored = sqlx::query_as::<_, Note>(&sql)
            .bind(note.id)
            .bind(note.status)
            .bind(note.user_id)
            .bind(note.person_id)
            .bind(note.tag_id)
            .bind(&note.content)
            .bind(note.created_at)
            .fetch_one(&mut *tx)
            .await?;
        bump_id_sequence(&mut *tx, "todo_notes").await?;

        tx.commit().await?;
        Ok(restored)
    }

    async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo_notes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
