//! Unified error types for the ledger engine.
//!
//! Validation failures (`InvalidAmount`, `OverAllocation`) are detected before
//! any write and reject the operation with no partial effect. `Storage` wraps
//! the underlying database error and is surfaced to the caller for retry at a
//! higher layer - the core never retries a non-idempotent write itself.

use thiserror::Error;

/// All failure modes surfaced by the ledger core.
#[derive(Debug, Error)]
pub enum Error {
    /// A non-positive or non-finite amount where a positive magnitude is required.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// The referenced transaction does not exist.
    #[error("Transaction {id} not found")]
    TransactionNotFound {
        /// The unknown transaction id
        id: i64,
    },

    /// The referenced envelope does not exist (by id or by name).
    #[error("Envelope not found: {name}")]
    EnvelopeNotFound {
        /// Name or id of the missing envelope
        name: String,
    },

    /// Destination amounts of an income plan exceed the gross amount.
    #[error("Allocations ({allocated:.2}) exceed gross income ({gross:.2})")]
    OverAllocation {
        /// The gross income amount
        gross: f64,
        /// The sum of all destination amounts
        allocated: f64,
    },

    /// The current period has already been closed.
    #[error("Month already closed on {closed_on}")]
    AlreadyClosed {
        /// Date of the prior closing transaction
        closed_on: chrono::DateTime<chrono::Utc>,
    },

    /// The ledger references state that cannot be resolved, e.g. the
    /// carry-over envelope is missing. Surfaced rather than silently
    /// skipped - skipping would lose money from the ledger.
    #[error("Inconsistent ledger state: {message}")]
    InconsistentState {
        /// Human-readable description of the inconsistency
        message: String,
    },

    /// Configuration file or seed data error.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// The underlying store is unreachable or rejected the operation.
    #[error("Storage unavailable: {0}")]
    Storage(#[from] sea_orm::DbErr),
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
