use booking_core::error::ValidationError;
use booking_core::policy::Denial;
use booking_core::session::SessionStatus;
use booking_core::types::RaterRole;
use thiserror::Error;

/// Every outcome an engine operation can fail with.
///
/// All variants except `Storage` are business outcomes the caller is
/// expected to handle. `Storage` means the store could not be reached or
/// returned something unreadable.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(#[from] Denial),

    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("not eligible: {0}")]
    NotEligible(String),

    #[error("session already has a {0} rating")]
    AlreadyRated(RaterRole),

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Only a lost race is worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Conflict(_))
    }
}

/// SQLite primary result codes for a lock held by another connection.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

impl From<anyhow::Error> for BookingError {
    fn from(e: anyhow::Error) -> Self {
        if is_lock_contention(&e) {
            return BookingError::Conflict(format!("store is busy, retry: {e:#}"));
        }
        BookingError::Storage(e)
    }
}

/// True if any cause in the chain is SQLITE_BUSY / SQLITE_LOCKED, including
/// their extended codes.
fn is_lock_contention(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => db
            .code()
            .and_then(|code| code.parse::<i64>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    })
}

pub type BookingResult<T> = Result<T, BookingError>;
