//! Repository for the `todo_items` table.

use async_trait::async_trait;
use doit_core::types::DbId;
use sqlx::PgPool;

use crate::models::todo_item::TodoItem;
use crate::repositories::{bump_id_sequence, EntityRepo};

/// Column list for `todo_items` queries.
const COLUMNS: &str = "\
    id, user_id, status, due, caption, content, author_id, contact_id, \
    created_at, updated_at";

/// Provides CRUD operations for todo items.
pub struct TodoItemRepo;

impl TodoItemRepo {
    /// A user's todo items, soonest due first (undated last), then by status.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<TodoItem>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM todo_items \
             WHERE user_id = $1 \
             ORDER BY due ASC NULLS LAST, status ASC, id ASC"
        );
        sqlx::query_as::<_, TodoItem>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}

#[async_trait]
impl EntityRepo for TodoItemRepo {
    type Entity = TodoItem;

    async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TodoItem>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM todo_items WHERE id = $1");
        sqlx::query_as::<_, TodoItem>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    async fn create(pool: &PgPool, item: &TodoItem) -> Result<TodoItem, sqlx::Error> {
        let sql = format!(
            "INSERT INTO todo_items (user_id, status, due, caption, content, author_id, contact_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TodoItem>(&sql)
            .bind(item.user_id)
            .bind(item.status)
            .bind(item.due)
            .bind(&item.caption)
            .bind(&item.content)
            .bind(item.author_id)
            .bind(item.contact_id)
            .fetch_one(pool)
            .await
    }

    async fn update(pool: &PgPool, item: &TodoItem) -> Result<TodoItem, sqlx::Error> {
        let sql = format!(
            "UPDATE todo_items SET \
                status = $2, due = $3, caption = $4, content = $5, \
                author_id = $6, contact_id = $7, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TodoItem>(&sql)
            .bind(item.id)
            .bind(item.status)
            .bind(item.due)
            .bind(&item.caption)
            .bind(&item.content)
            .bind(item.author_id)
            .bind(item.contact_id)
            .fetch_one(pool)
            .await
    }

    async fn restore(pool: &PgPool, item: &TodoItem) -> Result<TodoItem, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO todo_items \
                (id, user_id, status, due, caption, content, author_id, contact_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        let restored = sqlx::query_as::<_, TodoItem>(&sql)
            .bind(item.id)
            .bind(item.user_id)
            .bind(item.status)
            .bind(item.due)
            .bind(&item.caption)
            .bind(&item.content)
            .bind(item.author_id)
            .bind(item.contact_id)
            .bind(item.created_at)
            .fetch_one(&mut *tx)
            .await?;
        bump_id_sequence(&mut *tx, "todo_items").await?;

        tx.commit().await?;
        Ok(restored)
    }

    async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
