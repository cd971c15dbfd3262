//! Read projections over a customer's ledger.
//!
//! The account-history view lists non-deleted entries newest first with
//! derived debit/credit columns. [`verify_entries`] recomputes every snapshot
//! and the aggregate from the amounts alone, so stored state can be checked
//! for drift without trusting the cached values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::types::{Cheque, EntryKind, LedgerEntry, PaymentMethod};

/// One row of the account-history / statement view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub entry_id: i64,
    pub entry_date: NaiveDate,
    pub kind: EntryKind,
    pub method: PaymentMethod,
    pub description: String,
    pub document_number: Option<String>,
    pub debit: Cents,
    pub credit: Cents,
    pub balance: Cents,
    pub cheque: Option<Cheque>,
}

impl EntryView {
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        Self {
            entry_id: entry.entry_id,
            entry_date: entry.entry_date,
            kind: entry.kind,
            method: entry.method,
            description: entry.description.clone(),
            document_number: entry.document_number.clone(),
            debit: debit(entry),
            credit: credit(entry),
            balance: entry.balance_snapshot,
            cheque: entry.cheque.clone(),
        }
    }
}

/// Purchases show their absolute amount as debit.
pub fn debit(entry: &LedgerEntry) -> Cents {
    match entry.kind {
        EntryKind::Purchase => entry.amount.abs(),
        EntryKind::Payment => Cents::ZERO,
    }
}

/// Payments show their amount as credit.
pub fn credit(entry: &LedgerEntry) -> Cents {
    match entry.kind {
        EntryKind::Payment => entry.amount,
        EntryKind::Purchase => Cents::ZERO,
    }
}

/// Build the history view from entries in any order: deleted rows dropped,
/// newest entry first.
pub fn history_view<'a, I>(entries: I) -> Vec<EntryView>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut rows: Vec<EntryView> = entries
        .into_iter()
        .filter(|e| !e.is_deleted())
        .map(EntryView::from_entry)
        .collect();
    rows.sort_by(|a, b| b.entry_id.cmp(&a.entry_id));
    rows
}

/// A stored snapshot that disagrees with the recomputed prefix sum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDrift {
    pub entry_id: i64,
    pub stored: Cents,
    pub expected: Cents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub customer_id: i64,
    pub entries_checked: usize,
    pub stored_balance: Cents,
    pub expected_balance: Cents,
    pub drifted: Vec<SnapshotDrift>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.drifted.is_empty() && self.stored_balance == self.expected_balance
    }
}

/// Recompute snapshots and the aggregate from amounts only.
///
/// `entries` may contain deleted rows and come in any order; they are
/// skipped and sorted by entry order here.
pub fn verify_entries<'a, I>(customer_id: i64, stored_balance: Cents, entries: I) -> DriftReport
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut live: Vec<&LedgerEntry> = entries
        .into_iter()
        .filter(|e| e.customer_id == customer_id && !e.is_deleted())
        .collect();
    live.sort_by_key(|e| e.entry_id);

    let mut running = Cents::ZERO;
    let mut drifted = Vec::new();
    for e in &live {
        running += e.amount;
        if e.balance_snapshot != running {
            drifted.push(SnapshotDrift {
                entry_id: e.entry_id,
                stored: e.balance_snapshot,
                expected: running,
            });
        }
    }

    DriftReport {
        customer_id,
        entries_checked: live.len(),
        stored_balance,
        expected_balance: running,
        drifted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(id: i64, kind: EntryKind, amount: i64, snapshot: i64, deleted: bool) -> LedgerEntry {
        let ts = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        LedgerEntry {
            entry_id: id,
            customer_id: 1,
            kind,
            amount: Cents::new(amount),
            balance_snapshot: Cents::new(snapshot),
            method: PaymentMethod::Cash,
            document_number: None,
            description: format!("e{id}"),
            entry_date: ts.date_naive(),
            created_at: ts,
            deleted_at: if deleted { Some(ts) } else { None },
            cheque: None,
        }
    }

    #[test]
    fn debit_and_credit_are_derived_from_kind() {
        let p = entry(1, EntryKind::Purchase, -500, -500, false);
        let c = entry(2, EntryKind::Payment, 300, -200, false);
        assert_eq!((debit(&p), credit(&p)), (Cents::new(500), Cents::ZERO));
        assert_eq!((debit(&c), credit(&c)), (Cents::ZERO, Cents::new(300)));
    }

    #[test]
    fn history_view_is_newest_first_without_deleted() {
        let rows = [
            entry(1, EntryKind::Purchase, -500, -500, false),
            entry(3, EntryKind::Payment, 100, -400, false),
            entry(2, EntryKind::Payment, 50, -450, true),
        ];
        let view = history_view(&rows);
        let ids: Vec<i64> = view.iter().map(|v| v.entry_id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn clean_ledger_verifies() {
        let rows = [
            entry(1, EntryKind::Purchase, -500, -500, false),
            entry(2, EntryKind::Payment, 50, -450, true),
            entry(3, EntryKind::Payment, 100, -400, false),
        ];
        let report = verify_entries(1, Cents::new(-400), &rows);
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.entries_checked, 2);
    }

    #[test]
    fn drifted_snapshot_and_balance_are_reported() {
        let rows = [
            entry(1, EntryKind::Purchase, -500, -500, false),
            entry(2, EntryKind::Payment, 100, -450, false),
        ];
        let report = verify_entries(1, Cents::new(-450), &rows);
        assert!(!report.is_clean());
        assert_eq!(
            report.drifted,
            vec![SnapshotDrift {
                entry_id: 2,
                stored: Cents::new(-450),
                expected: Cents::new(-400)
            }]
        );
        assert_eq!(report.expected_balance, Cents::new(-400));
    }
}
