//! Error types for the payment processor.

use crate::money::Amount;
use thiserror::Error;

/// Result type alias for batch and CLI operations.
pub type Result<T> = std::result::Result<T, BatchError>;

/// Reasons a charge, refund, or processed payment did not succeed.
///
/// These travel inside a [`PaymentResult`](crate::types::PaymentResult) as
/// values; no payment operation returns them through `Err`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Charge amount was zero or negative
    #[error("Invalid amount")]
    InvalidAmount,

    /// Charge amount is above the provider's ceiling
    #[error("Amount exceeds {provider} limit of {limit}")]
    LimitExceeded { provider: &'static str, limit: Amount },

    /// Transaction id is absent from the gateway ledger
    #[error("Transaction {transaction_id} not found")]
    NotFound { transaction_id: String },

    /// Refund is larger than what remains of the original charge
    #[error("Refund amount {requested} exceeds original payment (remaining {remaining})")]
    AmountExceedsOriginal { requested: Amount, remaining: Amount },

    /// The fraud check did not approve the payment
    #[error("Payment declined due to fraud check")]
    FraudDeclined,
}

/// A notification provider failed outright (as opposed to reporting `false`).
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("{channel} provider failed: {message}")]
    Provider { channel: String, message: String },

    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Audit storage failure.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while running a CSV batch.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid batch record
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Unrecognised gateway name in configuration
    #[error("Unknown gateway '{0}', expected 'stripe' or 'paypal'")]
    UnknownGateway(String),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: payment-processor <input.csv>")]
    MissingArgument,
}
