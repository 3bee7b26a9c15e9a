//! Repository for the `todo_persons` table.

use async_trait::async_trait;
use doit_core::types::DbId;
use sqlx::PgPool;

use crate::models::person::Person;
use crate::repositories::{bump_id_sequence, EntityRepo};

/// Column list for `todo_persons` queries.
const COLUMNS: &str = "\
    id, status, email, family_name, given_name, owning_user_id, user_id, \
    created_at, updated_at";

/// Provides CRUD operations for persons.
pub struct PersonRepo;

impl PersonRepo {
    /// Persons in a user's contact list, by family then given name.
    pub async fn list_for_owner(
        pool: &PgPool,
        owning_user_id: DbId,
    ) -> Result<Vec<Person>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM todo_persons \
             WHERE owning_user_id = $1 \
             ORDER BY family_name ASC, given_name ASC NULLS FIRST, id ASC"
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(owning_user_id)
            .fetch_all(pool)
            .await
    }

    /// Link or unlink a person to a login. Not journaled.
    pub async fn set_login(
        pool: &PgPool,
        id: DbId,
        user_id: Option<DbId>,
    ) -> Result<Option<Person>, sqlx::Error> {
        let sql = format!(
            "UPDATE todo_persons SET user_id = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}

#[async_trait]
impl EntityRepo for PersonRepo {
    type Entity = Person;

    async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Person>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM todo_persons WHERE id = $1");
        sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    async fn create(pool: &PgPool, person: &Person) -> Result<Person, sqlx::Error> {
        let sql = format!(
            "INSERT INTO todo_persons (status, email, family_name, given_name, owning_user_id, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(person.status)
            .bind(&person.email)
            .bind(&person.family_name)
            .bind(&person.given_name)
            .bind(person.owning_user_id)
            .bind(person.user_id)
            .fetch_one(pool)
            .await
    }

    async fn update(pool: &PgPool, person: &Person) -> Result<Person, sqlx::Error> {
        let sql = format!(
            "UPDATE todo_persons SET \
                status = $2, email = $3, family_name = $4, given_name = $5, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(person.id)
            .bind(person.status)
            .bind(&person.email)
            .bind(&person.family_name)
            .bind(&person.given_name)
            .fetch_one(pool)
            .await
    }

    async fn restore(pool: &PgPool, person: &Person) -> Result<Person, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO todo_persons \
                (id, status, email, family_name, given_name, owning_user_id, user_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        let restored = sqlx::query_as::<_, Person>(&sql)
            .bind(person.id)
            .bind(person.status)
            .bind(&person.email)
            .bind(&person.family_name)
            .bind(&person.given_name)
            .bind(person.owning_user_id)
            .bind(person.user_id)
            .bind(person.created_at)
            .fetch_one(&mut *tx)
            .await?;
        bump_id_sequence(&mut *tx, "todo_persons").await?;

        tx.commit().await?;
        Ok(restored)
    }

    async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo_persons WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
