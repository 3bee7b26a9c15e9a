//! Repository for the `todo_configs` table.

use doit_core::types::DbId;
use sqlx::PgPool;

use crate::models::user_config::{UpsertUserConfig, UserConfig};

/// Column list for `todo_configs` queries.
const COLUMNS: &str = "id, user_id, properties, created_at, updated_at";

/// Provides data access for per-user settings.
pub struct UserConfigRepo;

impl UserConfigRepo {
    /// `None` if the user never saved settings.
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<UserConfig>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM todo_configs WHERE user_id = $1");
        sqlx::query_as::<_, UserConfig>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert the user's settings, or replace the stored properties.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        dto: &UpsertUserConfig,
    ) -> Result<UserConfig, sqlx::Error> {
        let sql = format!(
            "INSERT INTO todo_configs (user_id, properties) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 properties = EXCLUDED.properties, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserConfig>(&sql)
            .bind(user_id)
            .bind(serde_json::Value::Object(dto.properties.clone()))
            .fetch_one(pool)
            .await
    }
}
