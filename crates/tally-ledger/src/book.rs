//! In-memory ledger engine.
//!
//! `Book` owns customers, entries and cheques and implements the full
//! mutation engine (record, edit, soft delete, propagation) over plain
//! collections. It is deterministic: no IO, no clock. Callers pass `now`
//! explicitly.
//!
//! Every mutation validates and plans first, then applies. A rejected call
//! leaves the book untouched, which is the in-memory counterpart of the
//! storage transaction.
//!
//! # Usage
//! ```
//! use chrono::Utc;
//! use tally_ledger::{Book, Cents, NewEntry};
//!
//! let mut book = Book::new();
//! let now = Utc::now();
//! let c = book.create_customer("Herrería López", None, now).unwrap();
//! book.record_entry(
//!     NewEntry::purchase(c.customer_id, Cents::from_major(5_000), "Remito R-0001", "R-0001"),
//!     now,
//! )
//! .unwrap();
//! assert_eq!(book.customer(c.customer_id).unwrap().current_balance, Cents::from_major(-5_000));
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::LedgerError;
use crate::history::DescriptionHistory;
use crate::money::Cents;
use crate::mutation::{plan_amount_change, plan_delete, plan_record, DeletePlan, Propagation};
use crate::projection::{history_view, verify_entries, DriftReport, EntryView};
use crate::types::{
    Cheque, ChequeDue, ChequeStatus, Customer, EntryEdit, EntryKind, LedgerEntry, NewEntry,
    PaymentMethod,
};

#[derive(Clone, Debug, Default)]
pub struct Book {
    customers: BTreeMap<i64, Customer>,
    // keyed by entry_id, so iteration is entry order
    entries: BTreeMap<i64, LedgerEntry>,
    last_customer_id: i64,
    last_entry_id: i64,
    descriptions: DescriptionHistory,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Customers
    // -----------------------------------------------------------------------

    pub fn create_customer(
        &mut self,
        name: &str,
        tax_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Customer, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyField { field: "customer name" });
        }
        self.last_customer_id += 1;
        let customer = Customer {
            customer_id: self.last_customer_id,
            name: name.to_string(),
            tax_id: tax_id
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            current_balance: Cents::ZERO,
            last_purchase_at: None,
            created_at: now,
            deleted_at: None,
        };
        self.customers.insert(customer.customer_id, customer.clone());
        Ok(customer)
    }

    pub fn customer(&self, customer_id: i64) -> Result<&Customer, LedgerError> {
        self.customers
            .get(&customer_id)
            .ok_or(LedgerError::CustomerNotFound { customer_id })
    }

    /// Soft delete; idempotent. The ledger is kept.
    pub fn delete_customer(&mut self, customer_id: i64, now: DateTime<Utc>) -> Result<(), LedgerError> {
        let c = self.customer_mut(customer_id)?;
        if c.deleted_at.is_none() {
            c.deleted_at = Some(now);
        }
        Ok(())
    }

    /// Undo a customer soft delete; idempotent.
    pub fn restore_customer(&mut self, customer_id: i64) -> Result<(), LedgerError> {
        self.customer_mut(customer_id)?.deleted_at = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutation engine
    // -----------------------------------------------------------------------

    /// Record a purchase or payment as the customer's newest entry.
    pub fn record_entry(&mut self, req: NewEntry, now: DateTime<Utc>) -> Result<LedgerEntry, LedgerError> {
        let due_date = req.validate()?;
        let customer = self.customer(req.customer_id)?;
        if customer.is_deleted() {
            return Err(LedgerError::CustomerDeleted {
                customer_id: req.customer_id,
            });
        }
        let plan = plan_record(customer.current_balance, req.kind, req.amount)?;

        self.last_entry_id += 1;
        let entry_id = self.last_entry_id;

        let cheque = match (req.cheque, due_date) {
            (Some(details), Some(due_date)) => Some(Cheque {
                entry_id,
                amount: details.amount.unwrap_or(req.amount),
                number: details.number.trim().to_string(),
                bank: details.bank.trim().to_string(),
                drawer_name: details.drawer_name.trim().to_string(),
                due_date,
                status: ChequeStatus::Pending,
            }),
            _ => None,
        };

        let entry = LedgerEntry {
            entry_id,
            customer_id: req.customer_id,
            kind: req.kind,
            amount: plan.net_amount,
            balance_snapshot: plan.new_balance,
            method: req.method,
            document_number: req.document_number,
            description: req.description,
            entry_date: req.entry_date.unwrap_or_else(|| now.date_naive()),
            created_at: now,
            deleted_at: None,
            cheque,
        };
        self.entries.insert(entry_id, entry.clone());
        self.descriptions.remember(&entry.description);

        let customer = self.customer_mut(req.customer_id)?;
        customer.current_balance = plan.new_balance;
        if req.kind == EntryKind::Purchase {
            customer.last_purchase_at = Some(now);
        }

        Ok(entry)
    }

    /// Edit fields of a live entry. Amount edits keep the entry's kind and
    /// shift every later snapshot by the same delta.
    pub fn edit_entry(&mut self, entry_id: i64, edit: &EntryEdit) -> Result<LedgerEntry, LedgerError> {
        edit.validate()?;
        let entry = self.entry(entry_id)?;
        if entry.is_deleted() {
            return Err(LedgerError::EntryDeleted { entry_id });
        }
        if edit.method == Some(PaymentMethod::Cheque) && entry.cheque.is_none() {
            return Err(LedgerError::ChequeMethodWithoutCheque { entry_id });
        }
        let change = edit
            .amount
            .map(|abs| plan_amount_change(entry.kind, entry.amount, entry.balance_snapshot, abs))
            .transpose()?;
        let customer_id = entry.customer_id;
        // customer must exist before anything is written
        self.customer(customer_id)?;
        if let Some(p) = change.and_then(|c| c.propagation(entry_id)) {
            self.check_propagation(customer_id, &p)?;
        }

        let entry = self.entry_mut(entry_id)?;
        if let Some(d) = &edit.description {
            entry.description = d.clone();
        }
        if let Some(date) = edit.entry_date {
            entry.entry_date = date;
        }
        if let Some(method) = edit.method {
            entry.method = method;
        }
        if let Some(doc) = edit.document_update() {
            entry.document_number = doc;
        }
        let mut propagation = None;
        if let Some(change) = change {
            let old_abs = entry.amount.abs();
            entry.amount = change.new_amount;
            entry.balance_snapshot = change.new_snapshot;
            if let Some(cheque) = entry.cheque.as_mut() {
                if cheque.amount == old_abs {
                    cheque.amount = change.new_amount.abs();
                }
            }
            propagation = change.propagation(entry_id);
        }
        let updated = entry.clone();
        if let Some(d) = &edit.description {
            self.descriptions.remember(d);
        }

        if let Some(p) = propagation {
            self.apply_propagation(customer_id, p)?;
        }
        Ok(updated)
    }

    /// Soft delete an entry and reverse its contribution. Deleting twice is
    /// a no-op that reports [`DeletePlan::AlreadyDeleted`].
    pub fn delete_entry(&mut self, entry_id: i64, now: DateTime<Utc>) -> Result<DeletePlan, LedgerError> {
        let entry = self.entry(entry_id)?;
        let plan = plan_delete(entry.amount, entry.is_deleted());
        let customer_id = entry.customer_id;
        self.customer(customer_id)?;

        if let DeletePlan::Reverse { reversal_delta } = plan {
            let propagation = Propagation::after(entry_id, reversal_delta);
            if let Some(p) = &propagation {
                self.check_propagation(customer_id, p)?;
            }
            self.entry_mut(entry_id)?.deleted_at = Some(now);
            if let Some(p) = propagation {
                self.apply_propagation(customer_id, p)?;
            }
        }
        Ok(plan)
    }

    fn check_propagation(&self, customer_id: i64, p: &Propagation) -> Result<(), LedgerError> {
        let later = self
            .entries
            .range(p.after_entry_id + 1..)
            .map(|(_, e)| e)
            .filter(|e| e.customer_id == customer_id && !e.is_deleted())
            .map(|e| e.balance_snapshot);
        p.check_fits(self.customer(customer_id)?.current_balance, later)
    }

    /// The one propagation routine shared by edit and delete: later live
    /// snapshots and the customer aggregate absorb the same delta.
    fn apply_propagation(&mut self, customer_id: i64, p: Propagation) -> Result<(), LedgerError> {
        for e in self.entries.range_mut(p.after_entry_id + 1..).map(|(_, e)| e) {
            if e.customer_id == customer_id && !e.is_deleted() {
                e.balance_snapshot += p.delta;
            }
        }
        self.customer_mut(customer_id)?.current_balance += p.delta;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cheques
    // -----------------------------------------------------------------------

    pub fn set_cheque_status(&mut self, entry_id: i64, status: ChequeStatus) -> Result<Cheque, LedgerError> {
        let entry = self.entry_mut(entry_id)?;
        if entry.is_deleted() {
            return Err(LedgerError::EntryDeleted { entry_id });
        }
        let cheque = entry
            .cheque
            .as_mut()
            .ok_or(LedgerError::ChequeNotFound { entry_id })?;
        cheque.status = cheque.status.transition(entry_id, status)?;
        Ok(cheque.clone())
    }

    /// Pending cheques of live entries due on or before `date`.
    pub fn cheques_due(&self, on_or_before: NaiveDate) -> Vec<ChequeDue> {
        let mut due: Vec<ChequeDue> = self
            .entries
            .values()
            .filter(|e| !e.is_deleted())
            .filter_map(|e| e.cheque.as_ref().map(|c| (e.customer_id, c)))
            .filter(|(_, c)| c.status == ChequeStatus::Pending && c.due_date <= on_or_before)
            .map(|(customer_id, c)| ChequeDue {
                customer_id,
                cheque: c.clone(),
            })
            .collect();
        due.sort_by_key(|d| (d.cheque.due_date, d.cheque.entry_id));
        due
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Any entry, including soft-deleted ones.
    pub fn entry(&self, entry_id: i64) -> Result<&LedgerEntry, LedgerError> {
        self.entries
            .get(&entry_id)
            .ok_or(LedgerError::EntryNotFound { entry_id })
    }

    /// Live entries of a customer, newest first, cheques attached.
    pub fn list_entries(&self, customer_id: i64) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.customer(customer_id)?;
        Ok(self
            .entries
            .values()
            .rev()
            .filter(|e| e.customer_id == customer_id && !e.is_deleted())
            .cloned()
            .collect())
    }

    pub fn history(&self, customer_id: i64) -> Result<Vec<EntryView>, LedgerError> {
        self.customer(customer_id)?;
        Ok(history_view(
            self.entries.values().filter(|e| e.customer_id == customer_id),
        ))
    }

    pub fn verify(&self, customer_id: i64) -> Result<DriftReport, LedgerError> {
        let c = self.customer(customer_id)?;
        Ok(verify_entries(
            customer_id,
            c.current_balance,
            self.entries.values(),
        ))
    }

    pub fn descriptions(&self) -> &DescriptionHistory {
        &self.descriptions
    }

    fn customer_mut(&mut self, customer_id: i64) -> Result<&mut Customer, LedgerError> {
        self.customers
            .get_mut(&customer_id)
            .ok_or(LedgerError::CustomerNotFound { customer_id })
    }

    fn entry_mut(&mut self, entry_id: i64) -> Result<&mut LedgerEntry, LedgerError> {
        self.entries
            .get_mut(&entry_id)
            .ok_or(LedgerError::EntryNotFound { entry_id })
    }
}
