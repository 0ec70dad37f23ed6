use thiserror::Error;

/// Session store errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another instance of the application has locked the database
    #[error("Another instance of homedeck appears to be running. Please close it and try again.")]
    InstanceLocked,

    #[error("Session store migration failed: {0}")]
    Migration(String),

    #[error("Session store error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StoreError {
    /// Map SQLite lock conditions (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN)
    /// to `InstanceLocked`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return StoreError::InstanceLocked;
        }
        StoreError::Other(err)
    }
}

pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_messages_detected() {
        assert!(is_lock_message("error returned from database: database is locked"));
        assert!(is_lock_message("(code: 14) unable to open database file"));
        assert!(!is_lock_message("no such table: session"));
    }
}
