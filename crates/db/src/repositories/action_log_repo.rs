//! Repository for the `action_logs` table.
//!
//! Stack-scoped queries filter on `(user_id, entity_type, entity_id)`;
//! history is scoped by entity only.

use doit_core::action_log::{CompactionPlan, NewActionLog, StackKey};
use doit_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::action_log::ActionLogRow;

/// Column list for `action_logs` queries.
const COLUMNS: &str = "\
    id, user_id, entity_type, entity_id, action_type, changes, occurred_at, \
    is_compacted, undone_at, description";

/// Predicate (after `$1..$3` stack key binds) selecting the active stack.
const ACTIVE: &str = "user_id = $1 AND entity_type = $2 AND entity_id = $3 \
                      AND undone_at IS NULL AND NOT is_compacted";

/// Predicate (after `$1..$3` stack key binds) selecting the redo stack.
const REDO: &str = "user_id = $1 AND entity_type = $2 AND entity_id = $3 \
                    AND undone_at IS NOT NULL AND NOT is_compacted";

/// Provides storage operations for action log records.
pub struct ActionLogRepo;

impl ActionLogRepo {
    // -----------------------------------------------------------------------
    // Append / lookup
    // -----------------------------------------------------------------------

    pub async fn insert(pool: &PgPool, entry: &NewActionLog) -> Result<ActionLogRow, sqlx::Error> {
        let sql = format!(
            "INSERT INTO action_logs \
                (user_id, entity_type, entity_id, action_type, changes, occurred_at, \
                 is_compacted, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionLogRow>(&sql)
            .bind(entry.user_id)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(entry.action_type.as_str())
            .bind(entry.changes.to_json())
            .bind(entry.occurred_at)
            .bind(entry.is_compacted)
            .bind(&entry.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ActionLogRow>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM action_logs WHERE id = $1");
        sqlx::query_as::<_, ActionLogRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent active record of a stack.
    pub async fn find_active_head(
        pool: &PgPool,
        key: &StackKey,
    ) -> Result<Option<ActionLogRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM action_logs WHERE {ACTIVE} \
             ORDER BY occurred_at DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, ActionLogRow>(&sql)
            .bind(key.user_id)
            .bind(&key.entity_type)
            .bind(key.entity_id)
            .fetch_optional(pool)
            .await
    }

    /// Earliest undone record of a stack.
    pub async fn find_redo_head(
        pool: &PgPool,
        key: &StackKey,
    ) -> Result<Option<ActionLogRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM action_logs WHERE {REDO} \
             ORDER BY undone_at ASC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, ActionLogRow>(&sql)
            .bind(key.user_id)
            .bind(&key.entity_type)
            .bind(key.entity_id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Undo / redo flips
    // -----------------------------------------------------------------------

    /// Stamp the active head with `undone_at` in one statement and return
    /// it as stamped.
    pub async fn pop_active_head(
        pool: &PgPool,
        key: &StackKey,
        undone_at: Timestamp,
    ) -> Result<Option<ActionLogRow>, sqlx::Error> {
        let sql = format!(
            "UPDATE action_logs SET undone_at = $4 \
             WHERE id = ( \
                SELECT id FROM action_logs WHERE {ACTIVE} \
                ORDER BY occurred_at DESC, id DESC LIMIT 1 \
                FOR UPDATE) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionLogRow>(&sql)
            .bind(key.user_id)
            .bind(&key.entity_type)
            .bind(key.entity_id)
            .bind(undone_at)
            .fetch_optional(pool)
            .await
    }

    /// Clear `undone_at` on the redo head in one statement and return the
    /// record with the `undone_at` it had before.
    pub async fn pop_redo_head(
        pool: &PgPool,
        key: &StackKey,
    ) -> Result<Option<ActionLogRow>, sqlx::Error> {
        let sql = format!(
            "WITH head AS ( \
                SELECT id, undone_at FROM action_logs WHERE {REDO} \
                ORDER BY undone_at ASC, id DESC LIMIT 1 \
                FOR UPDATE) \
             UPDATE action_logs a SET undone_at = NULL \
             FROM head WHERE a.id = head.id \
             RETURNING a.id, a.user_id, a.entity_type, a.entity_id, a.action_type, \
                       a.changes, a.occurred_at, a.is_compacted, \
                       head.undone_at AS undone_at, a.description"
        );
        sqlx::query_as::<_, ActionLogRow>(&sql)
            .bind(key.user_id)
            .bind(&key.entity_type)
            .bind(key.entity_id)
            .fetch_optional(pool)
            .await
    }

    /// Returns `true` if the record exists.
    pub async fn set_undone_at(
        pool: &PgPool,
        id: DbId,
        undone_at: Option<Timestamp>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE action_logs SET undone_at = $2 WHERE id = $1")
            .bind(id)
            .bind(undone_at)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `true` if the record exists.
    pub async fn update_changes(
        pool: &PgPool,
        id: DbId,
        changes: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE action_logs SET changes = $2 WHERE id = $1")
            .bind(id)
            .bind(changes)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Counts / history
    // -----------------------------------------------------------------------

    pub async fn count_active(pool: &PgPool, key: &StackKey) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM action_logs WHERE {ACTIVE}");
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(key.user_id)
            .bind(&key.entity_type)
            .bind(key.entity_id)
            .fetch_one(pool)
            .await
    }

    pub async fn count_redo(pool: &PgPool, key: &StackKey) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM action_logs WHERE {REDO}");
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(key.user_id)
            .bind(&key.entity_type)
            .bind(key.entity_id)
            .fetch_one(pool)
            .await
    }

    /// History of an entity across all owners, newest first.
    pub async fn list_history(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
        include_undone: bool,
        limit: i64,
    ) -> Result<Vec<ActionLogRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM action_logs \
             WHERE entity_type = $1 AND entity_id = $2 \
               AND ($3 OR undone_at IS NULL) \
             ORDER BY occurred_at DESC, id DESC \
             LIMIT $4"
        );
        sqlx::query_as::<_, ActionLogRow>(&sql)
            .bind(entity_type)
            .bind(entity_id)
            .bind(include_undone)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Redo invalidation / ceiling
    // -----------------------------------------------------------------------

    /// Delete one record. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM action_logs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every undone record of a stack, compacted or not.
    pub async fn delete_redo(pool: &PgPool, key: &StackKey) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM action_logs \
             WHERE user_id = $1 AND entity_type = $2 AND entity_id = $3 \
               AND undone_at IS NOT NULL",
        )
        .bind(key.user_id)
        .bind(&key.entity_type)
        .bind(key.entity_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Flag the `count` oldest active records of a stack as compacted.
    pub async fn compact_oldest_active(
        pool: &PgPool,
        key: &StackKey,
        count: i64,
    ) -> Result<u64, sqlx::Error> {
        let sql = format!(
            "UPDATE action_logs SET is_compacted = TRUE \
             WHERE id IN ( \
                SELECT id FROM action_logs WHERE {ACTIVE} \
                ORDER BY occurred_at ASC, id ASC LIMIT $4)"
        );
        let result = sqlx::query(&sql)
            .bind(key.user_id)
            .bind(&key.entity_type)
            .bind(key.entity_id)
            .bind(count)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Compaction
    // -----------------------------------------------------------------------

    /// Distinct `(entity_type, entity_id)` pairs of a user with active
    /// records older than `cutoff`.
    pub async fn list_stale_stacks(
        pool: &PgPool,
        user_id: DbId,
        cutoff: Timestamp,
    ) -> Result<Vec<(String, DbId)>, sqlx::Error> {
        sqlx::query_as::<_, (String, DbId)>(
            "SELECT DISTINCT entity_type, entity_id FROM action_logs \
             WHERE user_id = $1 AND undone_at IS NULL AND NOT is_compacted \
               AND occurred_at < $2 \
             ORDER BY entity_type, entity_id",
        )
        .bind(user_id)
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Active records of one stack older than `cutoff`, oldest first.
    pub async fn list_stale_active(
        pool: &PgPool,
        key: &StackKey,
        cutoff: Timestamp,
    ) -> Result<Vec<ActionLogRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM action_logs WHERE {ACTIVE} AND occurred_at < $4 \
             ORDER BY occurred_at ASC, id ASC"
        );
        sqlx::query_as::<_, ActionLogRow>(&sql)
            .bind(key.user_id)
            .bind(&key.entity_type)
            .bind(key.entity_id)
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Users with active records older than `cutoff`.
    pub async fn list_owners_with_stale(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT DISTINCT user_id FROM action_logs \
             WHERE undone_at IS NULL AND NOT is_compacted AND occurred_at < $1 \
             ORDER BY user_id",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Apply one stack's compaction plan in a single transaction.
    ///
    /// The planned records are locked first. If any of them left the active
    /// stack since the plan was made (undone, compacted, or deleted), the
    /// transaction is rolled back and `false` is returned.
    pub async fn apply_compaction(
        pool: &PgPool,
        plan: &CompactionPlan,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let planned = plan.planned_ids();
        let still_active = sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM action_logs \
             WHERE id = ANY($1) AND undone_at IS NULL AND NOT is_compacted \
             FOR UPDATE",
        )
        .bind(&planned[..])
        .fetch_all(&mut *tx)
        .await?;
        if still_active.len() != planned.len() {
            tx.rollback().await?;
            return Ok(false);
        }

        if !plan.delete_ids.is_empty() {
            sqlx::query("DELETE FROM action_logs WHERE id = ANY($1)")
                .bind(&plan.delete_ids[..])
                .execute(&mut *tx)
                .await?;
        }

        for merged in &plan.merged {
            sqlx::query(
                "INSERT INTO action_logs \
                    (user_id, entity_type, entity_id, action_type, changes, occurred_at, \
                     is_compacted, description) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(merged.user_id)
            .bind(&merged.entity_type)
            .bind(merged.entity_id)
            .bind(merged.action_type.as_str())
            .bind(merged.changes.to_json())
            .bind(merged.occurred_at)
            .bind(merged.is_compacted)
            .bind(&merged.description)
            .execute(&mut *tx)
            .await?;
        }

        if !plan.flag_ids.is_empty() {
            sqlx::query("UPDATE action_logs SET is_compacted = TRUE WHERE id = ANY($1)")
                .bind(&plan.flag_ids[..])
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
