use thiserror::Error;

/// Errors surfaced by the session store.
///
/// `Unavailable` covers transient conditions (locked database, missing file,
/// failing disk) and is worth retrying. `ConstraintViolation` means the
/// record itself is invalid and a retry would fail the same way.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl StoreError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(e.to_string())
            }
            _ => Self::Unavailable(e.to_string()),
        }
    }
}
