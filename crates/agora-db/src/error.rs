use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The referenced row does not exist (listing, user, post, category).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint was hit (e.g. duplicate username).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The write was refused by a domain rule (closed auction, low bid,
    /// self-follow, non-owner close).
    #[error("{0}")]
    Rejected(String),

    /// The caller does not own the row it tried to change.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("database lock poisoned")]
    Poisoned,

    /// A database call run on a blocking thread panicked or was cancelled.
    #[error("database task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl DbError {
    /// Converts a constraint violation into `Conflict`, leaving other errors alone.
    pub(crate) fn from_constraint(err: rusqlite::Error, what: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(what.to_string())
            }
            _ => Self::Sqlite(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
