//! Ledger error taxonomy.
//!
//! Three caller-recoverable classes, each surfaced distinctly:
//!
//! - [`ErrorKind::Validation`]: malformed input such as a non-positive
//!   amount or incomplete cheque details.
//! - [`ErrorKind::NotFound`]: referenced customer, entry or cheque is absent.
//! - [`ErrorKind::Conflict`]: operation is invalid given current state, e.g.
//!   editing a deleted entry.
//!
//! Storage failures are not represented here. The storage layer reports them
//! as its own errors, and they abort the whole atomic unit.

use crate::money::{Cents, MoneyParseError};

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
        }
    }
}

/// All domain failures the mutation engine can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amounts crossing the boundary must be strictly positive.
    NonPositiveAmount { amount: Cents },
    /// A required text field was empty.
    EmptyField { field: &'static str },
    /// Cheque payment without (complete) cheque details.
    MissingChequeDetails { missing: Vec<&'static str> },
    /// Cheque details supplied where no cheque can be attached.
    UnexpectedChequeDetails,
    /// Switching an entry to the cheque method after creation.
    ChequeMethodWithoutCheque { entry_id: i64 },
    /// Decimal amount could not be converted exactly.
    InvalidAmount(MoneyParseError),
    /// Applying the amount would overflow the balance range.
    AmountOutOfRange { amount: Cents },
    /// Unknown enum text at the boundary (kind, method, status).
    UnknownValue { field: &'static str, value: String },

    CustomerNotFound { customer_id: i64 },
    EntryNotFound { entry_id: i64 },
    ChequeNotFound { entry_id: i64 },

    /// The entry is soft-deleted and can no longer be edited.
    EntryDeleted { entry_id: i64 },
    /// The customer is soft-deleted and accepts no new entries.
    CustomerDeleted { customer_id: i64 },
    /// Cheque status change not allowed from the current status.
    IllegalChequeTransition { entry_id: i64, from: &'static str, to: &'static str },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositiveAmount { .. }
            | Self::EmptyField { .. }
            | Self::MissingChequeDetails { .. }
            | Self::UnexpectedChequeDetails
            | Self::ChequeMethodWithoutCheque { .. }
            | Self::InvalidAmount(_)
            | Self::AmountOutOfRange { .. }
            | Self::UnknownValue { .. } => ErrorKind::Validation,

            Self::CustomerNotFound { .. }
            | Self::EntryNotFound { .. }
            | Self::ChequeNotFound { .. } => ErrorKind::NotFound,

            Self::EntryDeleted { .. }
            | Self::CustomerDeleted { .. }
            | Self::IllegalChequeTransition { .. } => ErrorKind::Conflict,
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveAmount { amount } => {
                write!(f, "amount must be > 0, got {amount}")
            }
            Self::EmptyField { field } => write!(f, "{field} must not be empty"),
            Self::MissingChequeDetails { missing } => {
                write!(f, "cheque payment requires {}", missing.join(", "))
            }
            Self::UnexpectedChequeDetails => {
                write!(f, "cheque details are only accepted on cheque payments")
            }
            Self::ChequeMethodWithoutCheque { entry_id } => write!(
                f,
                "entry {entry_id} has no cheque record; cheque details can only be attached at creation"
            ),
            Self::InvalidAmount(e) => write!(f, "invalid amount: {e}"),
            Self::AmountOutOfRange { amount } => {
                write!(f, "amount {amount} overflows the balance range")
            }
            Self::UnknownValue { field, value } => write!(f, "unknown {field}: {value:?}"),
            Self::CustomerNotFound { customer_id } => {
                write!(f, "customer {customer_id} not found")
            }
            Self::EntryNotFound { entry_id } => write!(f, "ledger entry {entry_id} not found"),
            Self::ChequeNotFound { entry_id } => {
                write!(f, "no cheque attached to ledger entry {entry_id}")
            }
            Self::EntryDeleted { entry_id } => {
                write!(f, "cannot edit a deleted transaction (entry {entry_id})")
            }
            Self::CustomerDeleted { customer_id } => {
                write!(f, "customer {customer_id} is deleted")
            }
            Self::IllegalChequeTransition { entry_id, from, to } => write!(
                f,
                "cheque of entry {entry_id} cannot move from {from} to {to}"
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<MoneyParseError> for LedgerError {
    fn from(e: MoneyParseError) -> Self {
        LedgerError::InvalidAmount(e)
    }
}
