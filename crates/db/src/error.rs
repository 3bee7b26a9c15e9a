//! Translation of sqlx failures into [`CoreError`].

use doit_core::error::CoreError;

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map a sqlx error onto the core error model.
///
/// Constraint violations are the caller's fault and surface as `Conflict`;
/// everything else is an infrastructure failure and surfaces as `Storage`.
pub fn to_core_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or("unknown");
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return CoreError::Conflict(format!(
                    "Operation violates reference constraint: {constraint}"
                ));
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn non_constraint_errors_are_storage() {
        assert_matches!(to_core_error(sqlx::Error::PoolTimedOut), CoreError::Storage(_));
        assert_matches!(to_core_error(sqlx::Error::RowNotFound), CoreError::Storage(_));
    }
}
