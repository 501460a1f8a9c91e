use crate::entities::TransactionType;
use thiserror::Error;

/// Every failure the ledger can report, from startup through request handling.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any error surfaced by the ORM or the underlying driver
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (binding the listener, reading files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No sequence row exists for the transaction type; seeding did not run
    #[error("No receipt sequence exists for transaction type {transaction_type:?}")]
    UnknownSequence {
        /// The type whose row is missing
        transaction_type: TransactionType,
    },

    /// Amount is zero, negative, not finite, or has more than two decimals
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Request fields failed validation
    #[error("Validation failed: {message}")]
    Validation {
        /// Which field failed and why
        message: String,
    },

    /// No record with this id exists for the requested transaction type
    #[error("Record '{id}' not found")]
    RecordNotFound {
        /// The requested record id
        id: String,
    },

    /// The path segment does not name a transaction-type collection
    #[error("Unknown collection '{name}'")]
    UnknownCollection {
        /// The unrecognised slug
        name: String,
    },

    /// A record with this idempotency key was inserted concurrently
    #[error("Duplicate submission for idempotency key '{idempotency_key}'")]
    DuplicateSubmission {
        /// The key that collided
        idempotency_key: String,
    },

    /// Another record already holds this receipt number for the type
    #[error("Receipt number {receipt_number} already issued for {transaction_type:?}")]
    ReceiptNumberCollision {
        /// The colliding receipt number
        receipt_number: String,
        /// Its transaction type
        transaction_type: TransactionType,
    },

    /// A store operation did not finish within the query timeout
    #[error("Database operation timed out after {after_ms} ms")]
    QueryTimeout {
        /// The configured limit in milliseconds
        after_ms: u64,
    },
}

impl Error {
    /// Whether a client may safely resubmit the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QueryTimeout { .. }
                | Self::ReceiptNumberCollision { .. }
                | Self::Database(sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_))
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnAcquireErr, DbErr, RuntimeErr};

    #[test]
    fn test_only_transient_database_errors_are_retryable() {
        let unreachable = Error::Database(DbErr::Conn(RuntimeErr::Internal(
            "connection refused".to_string(),
        )));
        let pool_exhausted = Error::Database(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout));
        let bad_query = Error::Database(DbErr::Custom("no such column".to_string()));
        let missing_row = Error::Database(DbErr::RecordNotFound("gone".to_string()));

        assert!(unreachable.is_retryable());
        assert!(pool_exhausted.is_retryable());
        assert!(!bad_query.is_retryable());
        assert!(!missing_row.is_retryable());
        assert!(Error::QueryTimeout { after_ms: 5000 }.is_retryable());
    }
}
