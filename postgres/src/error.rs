//! sqlx → store error mapping.

use mentorship_core::StoreError;

/// Map a sqlx error, keeping unique violations distinguishable.
///
/// The violated constraint's name is carried so callers and logs can tell
/// which rule fired.
pub(crate) fn db_error(context: &str, error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation(
                db_err.constraint().unwrap_or("unknown constraint").to_string(),
            );
        }
    }
    StoreError::Database(format!("{context}: {error}"))
}

/// Whether `error` violated the named unique constraint or index.
pub(crate) fn violates(error: &sqlx::Error, constraint: &str) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
    )
}
