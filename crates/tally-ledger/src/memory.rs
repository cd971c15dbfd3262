//! Thread-safe wrapper around [`Book`].
//!
//! One mutex guards the whole book, so mutations on the same customer are
//! fully serialized and a reader never observes a half-applied propagation.
//! The Postgres store narrows this to a per-customer row lock.

use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};

use crate::book::Book;
use crate::error::LedgerError;
use crate::mutation::DeletePlan;
use crate::projection::{DriftReport, EntryView};
use crate::types::{Cheque, ChequeDue, ChequeStatus, Customer, EntryEdit, LedgerEntry, NewEntry};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    book: Mutex<Book>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is all-or-nothing on the book, so a panic in another
    // holder cannot leave it half-written; poisoning is safe to clear.
    fn lock(&self) -> MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create_customer(&self, name: &str, tax_id: Option<&str>) -> Result<Customer, LedgerError> {
        self.lock().create_customer(name, tax_id, Utc::now())
    }

    pub fn customer(&self, customer_id: i64) -> Result<Customer, LedgerError> {
        self.lock().customer(customer_id).cloned()
    }

    pub fn delete_customer(&self, customer_id: i64) -> Result<(), LedgerError> {
        self.lock().delete_customer(customer_id, Utc::now())
    }

    pub fn restore_customer(&self, customer_id: i64) -> Result<(), LedgerError> {
        self.lock().restore_customer(customer_id)
    }

    pub fn record_entry(&self, req: NewEntry) -> Result<LedgerEntry, LedgerError> {
        self.lock().record_entry(req, Utc::now())
    }

    pub fn edit_entry(&self, entry_id: i64, edit: &EntryEdit) -> Result<LedgerEntry, LedgerError> {
        self.lock().edit_entry(entry_id, edit)
    }

    pub fn delete_entry(&self, entry_id: i64) -> Result<DeletePlan, LedgerError> {
        self.lock().delete_entry(entry_id, Utc::now())
    }

    pub fn entry(&self, entry_id: i64) -> Result<LedgerEntry, LedgerError> {
        self.lock().entry(entry_id).cloned()
    }

    pub fn list_entries(&self, customer_id: i64) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.lock().list_entries(customer_id)
    }

    pub fn history(&self, customer_id: i64) -> Result<Vec<EntryView>, LedgerError> {
        self.lock().history(customer_id)
    }

    pub fn set_cheque_status(&self, entry_id: i64, status: ChequeStatus) -> Result<Cheque, LedgerError> {
        self.lock().set_cheque_status(entry_id, status)
    }

    pub fn cheques_due(&self, on_or_before: NaiveDate) -> Vec<ChequeDue> {
        self.lock().cheques_due(on_or_before)
    }

    pub fn verify(&self, customer_id: i64) -> Result<DriftReport, LedgerError> {
        self.lock().verify(customer_id)
    }

    pub fn suggest_descriptions(&self, prefix: &str, limit: usize) -> Vec<String> {
        self.lock().descriptions().suggest(prefix, limit)
    }
}
