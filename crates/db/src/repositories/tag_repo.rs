//! Repository for the `todo_tags` table.

use async_trait::async_trait;
use doit_core::types::DbId;
use sqlx::PgPool;

use crate::models::tag::Tag;
use crate::repositories::{bump_id_sequence, EntityRepo};

/// Column list for `todo_tags` queries.
const COLUMNS: &str = "id, status, user_id, tag_name, created_at, updated_at";

/// Provides CRUD operations for tags.
pub struct TagRepo;

impl TagRepo {
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Tag>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM todo_tags WHERE user_id = $1 ORDER BY tag_name ASC, id ASC"
        );
        sqlx::query_as::<_, Tag>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}

#[async_trait]
impl EntityRepo for TagRepo {
    type Entity = Tag;

    async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Tag>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM todo_tags WHERE id = $1");
        sqlx::query_as::<_, Tag>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    async fn create(pool: &PgPool, tag: &Tag) -> Result<Tag, sqlx::Error> {
        let sql = format!(
            "INSERT INTO todo_tags (status, user_id, tag_name) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tag>(&sql)
            .bind(tag.status)
            .bind(tag.user_id)
            .bind(&tag.tag_name)
            .fetch_one(pool)
            .await
    }

    async fn update(pool: &PgPool, tag: &Tag) -> Result<Tag, sqlx::Error> {
        let sql = format!(
            "UPDATE todo_tags SET status = $2, tag_name = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tag>(&sql)
            .bind(tag.id)
            .bind(tag.status)
            .bind(&tag.tag_name)
            .fetch_one(pool)
            .await
    }

    async fn restore(pool: &PgPool, tag: &Tag) -> Result<Tag, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO todo_tags (id, status, user_id, tag_name, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let restored = sqlx::query_as::<_, Tag>(&sql)
            .bind(tag.id)
            .bind(tag.status)
            .bind(tag.user_id)
            .bind(&tag.tag_name)
            .bind(tag.created_at)
            .fetch_one(&mut *tx)
            .await?;
        bump_id_sequence(&mut *tx, "todo_tags").await?;

        tx.commit().await?;
        Ok(restored)
    }

    async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo_tags WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
