//! Per-user settings stored as a free-form JSON object.

use doit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `todo_configs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct UserConfig {
    pub id: DbId,
    pub user_id: DbId,
    pub properties: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO replacing a user's settings. Must be a JSON object.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertUserConfig {
    pub properties: serde_json::Map<String, serde_json::Value>,
}
