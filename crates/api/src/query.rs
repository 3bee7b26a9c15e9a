//! Shared query parameter types for API handlers.

use doit_core::action_log::DEFAULT_HISTORY_LIMIT;
use serde::Deserialize;

/// Upper bound on history rows per request.
pub const MAX_HISTORY_LIMIT: i64 = 500;

/// `?include_undone=&limit=` for entity history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub include_undone: Option<bool>,
    pub limit: Option<i64>,
}

impl HistoryParams {
    /// Undone records are listed unless explicitly excluded.
    pub fn include_undone(&self) -> bool {
        self.include_undone.unwrap_or(true)
    }

    /// Requested limit clamped to `1..=500`, default 100.
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}
