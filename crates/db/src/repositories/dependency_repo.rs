//! Repository for the `todo_deps` table.

use async_trait::async_trait;
use doit_core::types::DbId;
use sqlx::PgPool;

use crate::models::dependency::Dependency;
use crate::repositories::{bump_id_sequence, EntityRepo};

/// Column list for `todo_deps` queries.
const COLUMNS: &str = "id, relation, demanding_id, required_id, created_at, updated_at";

/// Provides CRUD operations for dependencies between todo items.
pub struct DependencyRepo;

impl DependencyRepo {
    /// Dependencies in which the todo item takes part on either side.
    pub async fn list_for_item(
        pool: &PgPool,
        todo_item_id: DbId,
    ) -> Result<Vec<Dependency>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM todo_deps \
             WHERE demanding_id = $1 OR required_id = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Dependency>(&sql)
            .bind(todo_item_id)
            .fetch_all(pool)
            .await
    }
}

#[async_trait]
impl EntityRepo for DependencyRepo {
    type Entity = Dependency;

    async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Dependency>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM todo_deps WHERE id = $1");
        sqlx::query_as::<_, Dependency>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    async fn create(pool: &PgPool, dep: &Dependency) -> Result<Dependency, sqlx::Error> {
        let sql = format!(
            "INSERT INTO todo_deps (relation, demanding_id, required_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dependency>(&sql)
            .bind(dep.relation)
            .bind(dep.demanding_id)
            .bind(dep.required_id)
            .fetch_one(pool)
            .await
    }

    async fn update(pool: &PgPool, dep: &Dependency) -> Result<Dependency, sqlx::Error> {
        let sql = format!(
            "UPDATE todo_deps SET relation = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dependency>(&sql)
            .bind(dep.id)
            .bind(dep.relation)
            .fetch_one(pool)
            .await
    }

    async fn restore(pool: &PgPool, dep: &Dependency) -> Result<Dependency, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO todo_deps (id, relation, demanding_id, required_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let restored = sqlx::query_as::<_, Dependency>(&sql)
            .bind(dep.id)
            .bind(dep.relation)
            .bind(dep.demanding_id)
            .bind(dep.required_id)
            .bind(dep.created_at)
            .fetch_one(&mut *tx)
            .await?;
        bump_id_sequence(&mut *tx, "todo_deps").await?;

        tx.commit().await?;
        Ok(restored)
    }

    async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo_deps WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
