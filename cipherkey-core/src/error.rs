//! Error taxonomy for the key-application protocol.

use thiserror::Error;

/// Result type for keying operations.
pub type KeyingResult<T> = Result<T, KeyingError>;

/// Errors surfaced by [`apply_keying`](crate::apply_keying).
///
/// Every failure is terminal for the invocation; the protocol never
/// retries. `DirectiveRejected` leaves the connection in the
/// partially-applied state as of the failing directive.
#[derive(Debug, Error)]
pub enum KeyingError {
    /// Zero or multiple key-setting directives were supplied.
    /// No engine interaction has occurred.
    #[error("exactly one key directive must be provided, got {count}")]
    InvalidKeyCount { count: usize },

    /// The connection already has an open transaction. Keys cannot
    /// be set or changed mid-transaction.
    #[error("cannot change encryption while a transaction is open")]
    AlreadyInTransaction,

    /// A directive's acknowledgment did not match the expected value,
    /// or the engine rejected the directive outright.
    #[error("directive '{name}' rejected: expected '{expected}', got '{got}'")]
    DirectiveRejected {
        name: String,
        expected: String,
        got: String,
    },

    /// The read probe failed: the supplied key does not match the
    /// existing encrypted content, or the file is not a valid
    /// database container.
    #[error("wrong key or unrecognized database format: {0}")]
    WrongKeyOrFormat(String),

    /// The write-back probe failed for a reason other than a
    /// read-only connection.
    #[error("population probe failed: {0}")]
    ProbeFailed(String),
}
