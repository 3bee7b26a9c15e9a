use std::time::Duration;

use doit_core::action_log::{
    ActionLogConfig, DEFAULT_COMPACTION_AGE_DAYS, DEFAULT_MAX_UNDOABLE_ACTIONS,
};

use crate::auth::jwt::JwtConfig;

/// Default period of the background compaction sweep: once a day.
const DEFAULT_COMPACTION_INTERVAL_SECS: u64 = 86_400;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Undo ceiling and compaction age handed to the action log engine.
    pub action_log: ActionLogConfig,
    /// Period of the background compaction sweep in seconds.
    pub compaction_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                              | Default                 |
    /// |--------------------------------------|-------------------------|
    /// | `HOST`                               | `0.0.0.0`               |
    /// | `PORT`                               | `3000`                  |
    /// | `CORS_ORIGINS`                       | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`               | `30`                    |
    /// | `ACTION_LOG_MAX_UNDOABLE`            | `100`                   |
    /// | `ACTION_LOG_COMPACTION_AGE_DAYS`     | `7`                     |
    /// | `ACTION_LOG_COMPACTION_INTERVAL_SECS`| `86400`                 |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values, a non-positive undo ceiling, or a
    /// missing `JWT_SECRET`.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_undoable_actions: i64 = std::env::var("ACTION_LOG_MAX_UNDOABLE")
            .unwrap_or_else(|_| DEFAULT_MAX_UNDOABLE_ACTIONS.to_string())
            .parse()
            .expect("ACTION_LOG_MAX_UNDOABLE must be a valid i64");
        assert!(
            max_undoable_actions > 0,
            "ACTION_LOG_MAX_UNDOABLE must be positive"
        );

        let compaction_age_days: i64 = std::env::var("ACTION_LOG_COMPACTION_AGE_DAYS")
            .unwrap_or_else(|_| DEFAULT_COMPACTION_AGE_DAYS.to_string())
            .parse()
            .expect("ACTION_LOG_COMPACTION_AGE_DAYS must be a valid i64");

        let compaction_interval_secs: u64 = std::env::var("ACTION_LOG_COMPACTION_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_COMPACTION_INTERVAL_SECS.to_string())
            .parse()
            .expect("ACTION_LOG_COMPACTION_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            action_log: ActionLogConfig {
                max_undoable_actions,
                compaction_age: chrono::Duration::days(compaction_age_days),
            },
            compaction_interval_secs,
        }
    }

    pub fn compaction_interval(&self) -> Duration {
        Duration::from_secs(self.compaction_interval_secs.max(1))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_origins(" http://a.test ,,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn interval_is_never_zero() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            jwt: JwtConfig {
                secret: "s".into(),
                access_token_expiry_mins: 15,
            },
            action_log: ActionLogConfig::default(),
            compaction_interval_secs: 0,
        };
        assert_eq!(config.compaction_interval(), Duration::from_secs(1));
    }
}
