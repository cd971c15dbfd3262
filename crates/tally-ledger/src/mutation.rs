//! Mutation planning: the arithmetic of the ledger engine, without storage.
//!
//! Every backend (the in-memory [`Book`](crate::Book) and the Postgres store)
//! computes its writes through these functions, so the sign convention and
//! the delta rules exist exactly once. A plan is computed from the rows read
//! under the customer lock and then applied verbatim:
//!
//! | operation | entry write | customer balance | later snapshots |
//! |---|---|---|---|
//! | record | `amount = net`, `snapshot = balance + net` | `+ net` | none (newest) |
//! | edit amount | `amount = new_net`, `snapshot += delta` | `+ delta` | `+ delta` |
//! | soft delete | `deleted_at = now` | `- amount` | `- amount` |
//!
//! Edit and delete both end in [`Propagation`]; backends apply it with a
//! single routine.

use crate::error::LedgerError;
use crate::money::Cents;
use crate::types::EntryKind;

/// Writes produced by recording a new entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecordPlan {
    pub net_amount: Cents,
    pub new_balance: Cents,
}

/// Writes produced by changing the amount of an existing entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AmountChange {
    pub new_amount: Cents,
    pub new_snapshot: Cents,
    pub delta: Cents,
}

impl AmountChange {
    pub fn propagation(&self, entry_id: i64) -> Option<Propagation> {
        Propagation::after(entry_id, self.delta)
    }
}

/// Outcome of planning a soft delete.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeletePlan {
    /// Entry was deleted earlier; nothing to apply.
    AlreadyDeleted,
    Reverse { reversal_delta: Cents },
}

/// A balance delta that every later non-deleted entry of the same customer
/// must absorb into its snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Propagation {
    /// Entries with `entry_id > after_entry_id` are affected.
    pub after_entry_id: i64,
    pub delta: Cents,
}

impl Propagation {
    /// `None` when there is nothing to propagate.
    pub fn after(after_entry_id: i64, delta: Cents) -> Option<Self> {
        if delta.is_zero() {
            None
        } else {
            Some(Self {
                after_entry_id,
                delta,
            })
        }
    }

    pub fn applies_to(&self, entry_id: i64) -> bool {
        entry_id > self.after_entry_id
    }

    /// Range check against everything that will absorb the delta: the
    /// customer balance and the later live snapshots. Run before any write.
    pub fn check_fits<I>(&self, current_balance: Cents, later_snapshots: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = Cents>,
    {
        let fits = |v: Cents| v.checked_add(self.delta).is_some();
        if fits(current_balance) && later_snapshots.into_iter().all(fits) {
            Ok(())
        } else {
            Err(LedgerError::AmountOutOfRange { amount: self.delta })
        }
    }
}

/// Plan a new entry against the customer's current balance.
pub fn plan_record(
    current_balance: Cents,
    kind: EntryKind,
    amount_abs: Cents,
) -> Result<RecordPlan, LedgerError> {
    if !amount_abs.is_positive() {
        return Err(LedgerError::NonPositiveAmount { amount: amount_abs });
    }
    let net_amount = kind.signed(amount_abs);
    let new_balance = current_balance
        .checked_add(net_amount)
        .ok_or(LedgerError::AmountOutOfRange { amount: amount_abs })?;
    Ok(RecordPlan {
        net_amount,
        new_balance,
    })
}

/// Plan an amount edit. The kind never changes, so the new net amount keeps
/// the entry's sign convention.
pub fn plan_amount_change(
    kind: EntryKind,
    old_amount: Cents,
    old_snapshot: Cents,
    new_amount_abs: Cents,
) -> Result<AmountChange, LedgerError> {
    if !new_amount_abs.is_positive() {
        return Err(LedgerError::NonPositiveAmount {
            amount: new_amount_abs,
        });
    }
    let out_of_range = LedgerError::AmountOutOfRange {
        amount: new_amount_abs,
    };
    let new_amount = kind.signed(new_amount_abs);
    let delta = new_amount
        .checked_sub(old_amount)
        .ok_or_else(|| out_of_range.clone())?;
    let new_snapshot = old_snapshot.checked_add(delta).ok_or(out_of_range)?;
    Ok(AmountChange {
        new_amount,
        new_snapshot,
        delta,
    })
}

/// Plan a soft delete. Idempotent: a deleted entry plans to nothing.
pub fn plan_delete(amount: Cents, already_deleted: bool) -> DeletePlan {
    if already_deleted {
        DeletePlan::AlreadyDeleted
    } else {
        DeletePlan::Reverse {
            reversal_delta: -amount,
        }
    }
}
