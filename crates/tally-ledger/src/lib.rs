//! tally-ledger
//!
//! Customer current-account ledger: running balance with per-entry snapshots.
//! - Signed amounts: payments add to the balance, purchases subtract
//! - Every entry caches the balance right after it (`balance_snapshot`)
//! - Amount edits and soft deletes shift all later snapshots by one delta
//! - Cheque sub-records with a small status machine
//! - Pure deterministic logic (no IO, no clock); storage lives in tally-db

mod book;
mod error;
mod history;
mod memory;
mod money;
mod types;

pub mod mutation;
pub mod projection;

pub use book::Book;
pub use error::{ErrorKind, LedgerError};
pub use history::DescriptionHistory;
pub use memory::MemoryLedger;
pub use money::{Cents, MoneyParseError, CENTS_SCALE, FRACTION_DIGITS};
pub use mutation::{
    plan_amount_change, plan_delete, plan_record, AmountChange, DeletePlan, Propagation,
    RecordPlan,
};
pub use projection::{history_view, verify_entries, DriftReport, EntryView, SnapshotDrift};
pub use types::{
    signed_amount, Cheque, ChequeDetails, ChequeDue, ChequeStatus, Customer, EntryEdit, EntryKind,
    LedgerEntry, NewEntry, PaymentMethod,
};
