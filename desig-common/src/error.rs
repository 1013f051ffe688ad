//! Common error types for the designation services

use thiserror::Error;

/// Common result type for designation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the designation services
#[derive(Error, Debug)]
pub enum Error {
    /// A designation does not have the `base + YY + suffix` shape
    #[error("Format error: {0}")]
    Format(String),

    /// Resolved or cached designation belongs to a different year than requested.
    /// Indicates a broken resolver scope; the batch must be aborted.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Store could not be reached (pool timeout, closed pool, I/O failure,
    /// write lock still held when the busy timeout expired)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// SQLite primary result codes for a database held by another writer
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        let unavailable = match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
            sqlx::Error::Database(db_err) => is_lock_contention(db_err.as_ref()),
            _ => false,
        };

        if unavailable {
            Error::StoreUnavailable(err)
        } else {
            Error::Database(err)
        }
    }
}

/// Busy timeout expired while another connection held the lock
///
/// Extended codes (e.g. 517 BUSY_SNAPSHOT) carry the primary code in the low byte.
fn is_lock_contention(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    db_err
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

impl Error {
    /// True for failures where retrying the same allocation is safe and may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}
